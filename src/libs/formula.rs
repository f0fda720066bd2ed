use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref ELEMENT_RE: Regex = Regex::new(r"([A-Z][a-z]?)(-?\d*)").unwrap();
    static ref MONOISOTOPIC: BTreeMap<&'static str, f64> = {
        let mut m = BTreeMap::new();
        m.insert("H", 1.007_825_032_07);
        m.insert("B", 11.009_305_4);
        m.insert("C", 12.0);
        m.insert("N", 14.003_074_004_8);
        m.insert("O", 15.994_914_619_56);
        m.insert("F", 18.998_403_22);
        m.insert("Na", 22.989_769_280_9);
        m.insert("Si", 27.976_926_532_5);
        m.insert("P", 30.973_761_63);
        m.insert("S", 31.972_071_00);
        m.insert("Cl", 34.968_852_68);
        m.insert("K", 38.963_706_68);
        m.insert("Se", 79.916_521_3);
        m.insert("Br", 78.918_337_1);
        m.insert("I", 126.904_473);
        m
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaError {
    pub input: String,
    pub message: String,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid formula \"{}\": {}", self.input, self.message)
    }
}

impl std::error::Error for FormulaError {}

/// A molecular formula as element counts.
///
/// Counts may be negative; this happens for differences between two losses
/// (e.g. `H-2`). Elements with a zero count are never stored, so two formulas
/// are equal iff they describe the same composition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Formula {
    counts: BTreeMap<String, i32>,
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a formula like `C6H12O6`, `ClH` or `H-2`. The empty string is the empty formula.
    pub fn parse(input: &str) -> Result<Self, FormulaError> {
        let text = input.trim();
        let mut formula = Formula::new();
        let mut consumed = 0;

        for cap in ELEMENT_RE.captures_iter(text) {
            let Some(whole) = cap.get(0) else {
                continue;
            };
            if whole.start() != consumed {
                return Err(FormulaError {
                    input: input.to_string(),
                    message: format!("unexpected character at position {}", consumed + 1),
                });
            }
            consumed = whole.end();

            let element = &cap[1];
            if !MONOISOTOPIC.contains_key(element) {
                return Err(FormulaError {
                    input: input.to_string(),
                    message: format!("unknown element {}", element),
                });
            }
            let count = match &cap[2] {
                "" => 1,
                "-" => -1,
                s => s.parse::<i32>().map_err(|e| FormulaError {
                    input: input.to_string(),
                    message: e.to_string(),
                })?,
            };
            formula.shift(element, count);
        }

        if consumed != text.len() {
            return Err(FormulaError {
                input: input.to_string(),
                message: format!("unexpected character at position {}", consumed + 1),
            });
        }

        Ok(formula)
    }

    /// Count of one element (0 if absent)
    pub fn count(&self, element: &str) -> i32 {
        self.counts.get(element).copied().unwrap_or(0)
    }

    /// Add `delta` atoms of `element`
    pub fn shift(&mut self, element: &str, delta: i32) {
        let entry = self.counts.entry(element.to_string()).or_insert(0);
        *entry += delta;
        if *entry == 0 {
            self.counts.remove(element);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Element-wise sum
    pub fn add(&self, other: &Formula) -> Formula {
        let mut res = self.clone();
        for (el, &n) in &other.counts {
            res.shift(el, n);
        }
        res
    }

    /// Element-wise difference `self - other`
    pub fn diff(&self, other: &Formula) -> Formula {
        let mut res = self.clone();
        for (el, &n) in &other.counts {
            res.shift(el, -n);
        }
        res
    }

    /// The formula with every count negated
    pub fn negate(&self) -> Formula {
        Formula::new().diff(self)
    }

    /// Total number of atoms
    pub fn atom_count(&self) -> i32 {
        self.counts.values().sum()
    }

    /// Sum of absolute per-element count differences
    pub fn symmetric_difference(&self, other: &Formula) -> i32 {
        self.diff(other).counts.values().map(|n| n.abs()).sum()
    }

    /// True if every element of `part` occurs in `self` at least as often
    pub fn contains(&self, part: &Formula) -> bool {
        self.diff(part).counts.values().all(|&n| n >= 0)
    }

    /// Monoisotopic mass
    pub fn mass(&self) -> f64 {
        self.counts
            .iter()
            .map(|(el, &n)| MONOISOTOPIC.get(el.as_str()).copied().unwrap_or(0.0) * n as f64)
            .sum()
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

/// Hill order: C, then H, then the rest alphabetically.
/// Without carbon, all elements are alphabetical.
impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_el = |f: &mut fmt::Formatter<'_>, el: &str, n: i32| -> fmt::Result {
            if n == 1 {
                write!(f, "{}", el)
            } else {
                write!(f, "{}{}", el, n)
            }
        };

        let has_carbon = self.counts.contains_key("C");
        if has_carbon {
            write_el(f, "C", self.count("C"))?;
            if let Some(&h) = self.counts.get("H") {
                write_el(f, "H", h)?;
            }
        }
        for (el, &n) in &self.counts {
            if has_carbon && (el == "C" || el == "H") {
                continue;
            }
            write_el(f, el, n)?;
        }
        Ok(())
    }
}
