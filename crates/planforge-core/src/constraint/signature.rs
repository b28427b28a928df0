//! Normalized cache keys for constraint sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlanForgeError;

use super::Constraints;

const SEPARATOR: char = '|';
const RESERVED: [char; 5] = ['|', ';', ',', '(', ')'];

/// Normalized, order-independent encoding of a constraint set.
///
/// Built from one token per constraint: the constraint type, the
/// joint/link it refers to, and its numeric parameters quantized to 1e-6.
/// Tokens are sorted and deduplicated, so two constraint sets that differ
/// only in ordering, naming or weights share a signature. The text form is
/// stable across processes and is what the approximation store persists.
///
/// # Example
///
/// ```
/// use planforge_core::{ConstraintSignature, Constraints, JointConstraint};
///
/// let a = Constraints::named("a")
///     .with_joint(JointConstraint::new("shoulder", 0.5, 0.1))
///     .with_joint(JointConstraint::new("elbow", 0.0, 0.2));
/// let b = Constraints::named("b")
///     .with_joint(JointConstraint::new("elbow", 0.0, 0.2))
///     .with_joint(JointConstraint::new("shoulder", 0.5, 0.1));
///
/// assert_eq!(a.signature(), b.signature());
///
/// let parsed: ConstraintSignature = a.signature().to_string().parse().unwrap();
/// assert_eq!(parsed, a.signature());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConstraintSignature(String);

impl ConstraintSignature {
    pub fn from_constraints(constraints: &Constraints) -> Self {
        let mut tokens: Vec<String> = Vec::with_capacity(constraints.len());

        for jc in &constraints.joint_constraints {
            tokens.push(format!(
                "joint({};{};{};{})",
                sanitize(&jc.joint_name),
                quantize(jc.position),
                quantize(jc.tolerance_above),
                quantize(jc.tolerance_below),
            ));
        }
        for pc in &constraints.position_constraints {
            tokens.push(format!(
                "position({};{},{},{};{})",
                sanitize(&pc.link_name),
                quantize(pc.target[0]),
                quantize(pc.target[1]),
                quantize(pc.target[2]),
                quantize(pc.tolerance),
            ));
        }
        for oc in &constraints.orientation_constraints {
            let q = oc.orientation.canonical();
            tokens.push(format!(
                "orientation({};{},{},{},{};{},{},{})",
                sanitize(&oc.link_name),
                quantize(q.x),
                quantize(q.y),
                quantize(q.z),
                quantize(q.w),
                quantize(oc.absolute_x_axis_tolerance),
                quantize(oc.absolute_y_axis_tolerance),
                quantize(oc.absolute_z_axis_tolerance),
            ));
        }

        tokens.sort();
        tokens.dedup();
        Self(tokens.join(&SEPARATOR.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the signature of an empty constraint set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct constraint tokens.
    pub fn token_count(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.0.split(SEPARATOR).count()
        }
    }
}

impl fmt::Display for ConstraintSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConstraintSignature {
    type Err = PlanForgeError;

    /// Parses and validates the canonical text form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self(String::new()));
        }
        let tokens: Vec<&str> = s.split(SEPARATOR).collect();
        for window in tokens.windows(2) {
            if window[0] >= window[1] {
                return Err(corrupt(s, "tokens are not sorted and unique"));
            }
        }
        for token in &tokens {
            validate_token(token).map_err(|reason| corrupt(s, reason))?;
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ConstraintSignature {
    type Error = PlanForgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConstraintSignature> for String {
    fn from(value: ConstraintSignature) -> Self {
        value.0
    }
}

fn corrupt(s: &str, reason: &str) -> PlanForgeError {
    PlanForgeError::CorruptStore(format!("malformed constraint signature '{s}': {reason}"))
}

fn validate_token(token: &str) -> Result<(), &'static str> {
    let open = token.find('(').ok_or("missing '('")?;
    let body = token[open + 1..]
        .strip_suffix(')')
        .ok_or("missing ')'")?;
    // numeric group sizes after the name, per kind
    let arity: &[usize] = match &token[..open] {
        "joint" => &[1, 1, 1],
        "position" => &[3, 1],
        "orientation" => &[4, 3],
        _ => return Err("unknown constraint kind"),
    };
    let mut parts = body.split(';');
    let name = parts.next().ok_or("missing name")?;
    if name.is_empty() || name.contains(&RESERVED[..]) {
        return Err("invalid name");
    }
    let groups: Vec<&str> = parts.collect();
    if groups.len() != arity.len() {
        return Err("wrong number of fields");
    }
    for (group, expected) in groups.iter().zip(arity) {
        let values: Vec<&str> = group.split(',').collect();
        if values.len() != *expected {
            return Err("wrong number of values");
        }
        for value in values {
            let v: f64 = value.parse().map_err(|_| "non-numeric value")?;
            if !v.is_finite() {
                return Err("non-finite value");
            }
            if render(v) != value {
                return Err("value is not in canonical form");
            }
        }
    }
    Ok(())
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

fn quantize(value: f64) -> String {
    render((value * 1e6).round() / 1e6)
}

fn render(value: f64) -> String {
    // -0.0 and 0.0 must render identically
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:.6}")
}
