//! Placeholder normalization
//!
//! Positional markers (`?` appearance-ordered, `$n` explicitly numbered) are
//! collected with the type their context implies, then collapsed into the
//! final params tuple: one slot per distinct position, tuple order by first
//! appearance, repeats unified to the most specific compatible type. A
//! marker inside a list-expansion context (`IN`, `= ANY(...)`) produces a
//! single array-typed slot.

use sqlbind_common::{Error, FieldType, SemanticType};

/// Where a marker points: `?` markers are one slot per appearance, `$n`
/// markers share a slot per position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Auto(u32),
    Numbered(u32),
}

#[derive(Debug, Clone)]
struct Site {
    position: Position,
    field: FieldType,
    list_context: bool,
}

/// Accumulates placeholder usage sites during a statement walk.
#[derive(Debug, Default)]
pub struct ParamCollector {
    sites: Vec<Site>,
    next_auto: u32,
    seen_auto: bool,
    seen_numbered: bool,
}

impl ParamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one usage site. `field` is the type the surrounding context
    /// implies (`FieldType::unknown()` when there is none); `list_context`
    /// marks markers expanded as value lists.
    pub fn record(&mut self, marker: &str, field: FieldType, list_context: bool) {
        let position = self.position_of(marker);
        self.sites.push(Site {
            position,
            field,
            list_context,
        });
    }

    fn position_of(&mut self, marker: &str) -> Position {
        if let Some(digits) = marker.strip_prefix('$') {
            if let Ok(n) = digits.parse::<u32>() {
                self.seen_numbered = true;
                return Position::Numbered(n);
            }
        }
        if let Some(digits) = marker.strip_prefix('?') {
            if let Ok(n) = digits.parse::<u32>() {
                self.seen_numbered = true;
                return Position::Numbered(n);
            }
        }
        self.seen_auto = true;
        let position = Position::Auto(self.next_auto);
        self.next_auto += 1;
        position
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Collapse sites into the final tuple. Slots come out in first
    /// appearance order, renumbered contiguously; incompatible repeats are
    /// conflicts that degrade the slot to `Unknown`.
    pub fn finish(self) -> (Vec<FieldType>, Vec<Error>) {
        let mut errors = Vec::new();
        if self.seen_auto && self.seen_numbered {
            errors.push(Error::MixedPlaceholders);
        }

        let mut order: Vec<Position> = Vec::new();
        for site in &self.sites {
            if !order.contains(&site.position) {
                order.push(site.position);
            }
        }

        let mut slots = Vec::with_capacity(order.len());
        for position in order {
            let sites: Vec<&Site> = self
                .sites
                .iter()
                .filter(|s| s.position == position)
                .collect();

            let mut semantic = SemanticType::Unknown;
            let mut conflicted = false;
            for site in &sites {
                match semantic.unify(&site.field.semantic) {
                    Some(unified) => semantic = unified,
                    None => {
                        errors.push(Error::ParamConflict {
                            position: position_display(position),
                            first: semantic.to_string(),
                            second: site.field.semantic.to_string(),
                        });
                        conflicted = true;
                        break;
                    }
                }
            }
            if conflicted {
                // Never assert anything about a conflicted slot.
                slots.push(FieldType::unknown());
                continue;
            }

            // A site that requires a non-null value makes the slot non-null
            // for the caller; results go the other way.
            let nullable = sites.iter().all(|s| s.field.nullable);
            let list_context = sites.iter().any(|s| s.list_context);

            let semantic = if list_context {
                SemanticType::Array(Box::new(semantic))
            } else {
                semantic
            };
            slots.push(FieldType::new(semantic, nullable));
        }

        (slots, errors)
    }
}

fn position_display(position: Position) -> String {
    match position {
        Position::Auto(n) => format!("?{}", n + 1),
        Position::Numbered(n) => format!("${n}"),
    }
}

/// Lexically scan raw statement text for markers, for statements the parser
/// rejected: the tuple arity and order survive, every slot explicitly
/// Unknown. Strings and comments are skipped; `?|`/`?&` operators are not
/// markers.
pub fn lexical_params(text: &str) -> Vec<FieldType> {
    let mut collector = ParamCollector::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            '\'' | '"' => {
                let quote = chars[i];
                i += 1;
                while i < chars.len() {
                    if chars[i] == quote {
                        if chars.get(i + 1) == Some(&quote) {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            '$' => {
                let mut j = i + 1;
                let mut digits = String::new();
                while j < chars.len() && chars[j].is_ascii_digit() {
                    digits.push(chars[j]);
                    j += 1;
                }
                if !digits.is_empty() {
                    collector.record(&format!("${digits}"), FieldType::unknown(), false);
                }
                i = j.max(i + 1);
            }
            '?' => {
                // ?| and ?& are JSON operators, not markers
                if !matches!(chars.get(i + 1), Some('|') | Some('&')) {
                    collector.record("?", FieldType::unknown(), false);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    let (slots, _) = collector.finish();
    slots
}
