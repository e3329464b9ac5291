use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

const MIN_SENTENCE_CHARS: usize = 10;
const CONTEXT_CHARS: usize = 30;

static SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());
static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([0-9]+)x\)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Screw,
    SelfTap,
    Nut,
    Bearing,
    Motor,
    Belt,
    Rod,
    Pulley,
    Cable,
    Printed,
    Measurement,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Screw => "screw",
            ComponentKind::SelfTap => "self_tap",
            ComponentKind::Nut => "nut",
            ComponentKind::Bearing => "bearing",
            ComponentKind::Motor => "motor",
            ComponentKind::Belt => "belt",
            ComponentKind::Rod => "rod",
            ComponentKind::Pulley => "pulley",
            ComponentKind::Cable => "cable",
            ComponentKind::Printed => "printed",
            ComponentKind::Measurement => "measurement",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Evaluation order is output order within a sentence.
const PATTERNS: &[(ComponentKind, &str)] = &[
    (ComponentKind::Screw, r"M[2-8]x[0-9]+[a-zA-Z]*\s*(?:screw|bolt)"),
    (ComponentKind::SelfTap, r"[0-9.]+x[0-9.]+[a-zA-Z]*\s*self-tapping"),
    (ComponentKind::Nut, r"M[2-8]\s*(?:nut|square\s*nut)"),
    (ComponentKind::Bearing, r"(?:bearing|ball\s*bearing)\s*[0-9x]+"),
    (ComponentKind::Motor, r"(?:stepper\s*)?motor(?:\s+[A-Z0-9-]+)?"),
    (ComponentKind::Belt, r"(?:GT[2-9]|timing)\s*belt"),
    (ComponentKind::Rod, r"(?:smooth|linear|threaded)\s*rod"),
    (ComponentKind::Pulley, r"pulley\s*(?:[0-9]+T)?"),
    (ComponentKind::Cable, r"(?:cable|wire)\s*(?:[0-9]+\s*(?:pin|wire|conductor))?"),
    (ComponentKind::Printed, r"printed\s*(?:part|component)"),
    (ComponentKind::Measurement, r"[0-9]+x[0-9]+(?:x[0-9]+)?\s*mm"),
];

struct Rule {
    kind: ComponentKind,
    re: Regex,
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .map(|(kind, pattern)| Rule {
            kind: *kind,
            re: Regex::new(&format!("(?i){}", pattern)).unwrap(),
        })
        .collect()
});

/// Which matches of a sentence receive its `(Nx)` quantity annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QuantityScope {
    /// Every match in the sentence (output-compatible with earlier BOM files).
    #[default]
    Sentence,
    /// Only matches whose context window contains the annotation.
    Context,
}

/// One hardware pattern hit on a manual page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub page: u32,
    pub kind: ComponentKind,
    pub component: String,
    pub quantity: Option<String>,
    pub context: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    scope: QuantityScope,
}

impl Extractor {
    pub fn new(scope: QuantityScope) -> Self {
        Extractor { scope }
    }

    /// Scan cleaned page text. Output is ordered by sentence, then rule, then match position.
    pub fn extract(&self, text: &str, page: u32) -> Vec<Mention> {
        let mut mentions = Vec::new();
        for sentence in SENTENCE_RE.split(text) {
            if sentence.chars().count() < MIN_SENTENCE_CHARS {
                continue;
            }
            self.extract_sentence(sentence, page, &mut mentions);
        }
        mentions
    }

    fn extract_sentence(&self, sentence: &str, page: u32, out: &mut Vec<Mention>) {
        let annotation: Option<(Range<usize>, String)> = QUANTITY_RE.captures(sentence).and_then(|caps| {
            let whole = caps.get(0)?;
            let count = caps.get(1)?;
            Some((whole.range(), count.as_str().to_string()))
        });
        let first = out.len();

        for rule in RULES.iter() {
            for m in rule.re.find_iter(sentence) {
                let window = context_window(sentence, m.range());
                let quantity = match (&annotation, self.scope) {
                    (Some((_, qty)), QuantityScope::Sentence) => Some(qty.clone()),
                    (Some((span, qty)), QuantityScope::Context)
                        if span.start >= window.start && span.end <= window.end =>
                    {
                        Some(qty.clone())
                    }
                    _ => None,
                };
                out.push(Mention {
                    page,
                    kind: rule.kind,
                    component: m.as_str().to_string(),
                    quantity,
                    context: sentence[window].trim().to_string(),
                });
            }
        }

        let found = out.len() - first;
        if let Some((_, qty)) = &annotation {
            if found > 1 && self.scope == QuantityScope::Sentence {
                debug!(page, found, quantity = %qty, "quantity annotation shared by every match in sentence");
            }
        }
    }
}

/// Byte range of up to CONTEXT_CHARS chars either side of `m`, clipped to the sentence.
fn context_window(sentence: &str, m: Range<usize>) -> Range<usize> {
    let start = sentence[..m.start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = sentence[m.end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map(|(i, _)| m.end + i)
        .unwrap_or(sentence.len());
    start..end
}
