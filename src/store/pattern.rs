//! Glob matching for KEYS-style patterns.
//!
//! Supports `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\` escapes, which is the
//! subset of the store's pattern syntax that invalidation relies on.

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

// == Key Pattern ==
/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    tokens: Vec<Token>,
}

impl KeyPattern {
    /// Compiles `pattern` the way the store reads it: a trailing backslash
    /// stands for itself and an unterminated class runs to the end of the
    /// pattern, so every input is a valid pattern.
    pub fn new(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '*' => {
                    // Collapse runs of stars.
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyOne);
                    i += 1;
                }
                '\\' => {
                    tokens.push(Token::Literal(chars.get(i + 1).copied().unwrap_or('\\')));
                    i += 2;
                }
                '[' => {
                    i += 1;
                    let negated = chars.get(i) == Some(&'^');
                    if negated {
                        i += 1;
                    }

                    let mut ranges = Vec::new();
                    while i < chars.len() && chars[i] != ']' {
                        if chars[i] == '\\' && i + 1 < chars.len() {
                            ranges.push((chars[i + 1], chars[i + 1]));
                            i += 2;
                        } else if i + 2 < chars.len() && chars[i + 1] == '-' {
                            let (start, end) = (chars[i], chars[i + 2]);
                            ranges.push((start.min(end), start.max(end)));
                            i += 3;
                        } else {
                            ranges.push((chars[i], chars[i]));
                            i += 1;
                        }
                    }
                    // Step over the closing bracket, if any.
                    i += 1;

                    tokens.push(Token::Class { negated, ranges });
                }
                other => {
                    tokens.push(Token::Literal(other));
                    i += 1;
                }
            }
        }

        Self { tokens }
    }

    /// Whether `key` matches the whole pattern.
    pub fn matches(&self, key: &str) -> bool {
        let key: Vec<char> = key.chars().collect();
        let (mut t, mut k) = (0, 0);
        // Backtrack point: token index after the last `*`, and the key index it consumed up to.
        let mut star: Option<(usize, usize)> = None;

        while k < key.len() {
            match self.tokens.get(t) {
                Some(Token::AnyRun) => {
                    star = Some((t + 1, k));
                    t += 1;
                }
                Some(token) if token_matches(token, key[k]) => {
                    t += 1;
                    k += 1;
                }
                _ => match star {
                    Some((after_star, consumed)) => {
                        t = after_star;
                        k = consumed + 1;
                        star = Some((after_star, consumed + 1));
                    }
                    None => return false,
                },
            }
        }

        self.tokens[t..].iter().all(|token| *token == Token::AnyRun)
    }
}

fn token_matches(token: &Token, c: char) -> bool {
    match token {
        Token::Literal(expected) => *expected == c,
        Token::AnyOne => true,
        Token::AnyRun => false,
        Token::Class { negated, ranges } => {
            let hit = ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&c));
            hit != *negated
        }
    }
}
