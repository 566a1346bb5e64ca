//! Config validation: unknown-key detection with Levenshtein suggestions
//! and numerical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " — did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for EngineConfig.
///
/// Maintained by hand to match the struct hierarchy in engine_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [pvt]
        "pvt",
        "pvt.allow_extrapolation",
        "pvt.default_bw",
        // [diagnostics]
        "diagnostics",
        "diagnostics.ratio_epsilon",
        "diagnostics.min_points",
        // [regression]
        "regression",
        "regression.r2_tie_tolerance",
        // [forecast]
        "forecast",
        "forecast.steps_per_year",
        "forecast.days_per_year",
        "forecast.solver",
        "forecast.max_iterations",
        "forecast.pressure_tolerance_psi",
        // [consistency]
        "consistency",
        "consistency.warning_fraction",
        "consistency.error_fraction",
        "consistency.warning_weight",
        "consistency.error_weight",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys — it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Numerical Range Validation
// ============================================================================

/// Validate numerical ranges on a parsed EngineConfig.
///
/// Returns (errors, warnings) — errors are values the engine cannot run
/// with; warnings are legal but unusual.
pub fn validate_physical_ranges(
    config: &super::EngineConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Bw: water is slightly compressible, 0.9-1.2 rb/STB covers any brine
    let bw = config.pvt.default_bw;
    if !(bw.is_finite() && bw > 0.0) {
        errors.push(format!("pvt.default_bw = {bw} must be > 0"));
    } else if !(0.9..=1.2).contains(&bw) {
        warnings.push(ValidationWarning {
            field: "pvt.default_bw".to_string(),
            message: format!("pvt.default_bw = {bw:.3} is outside typical range (0.9-1.2 rb/STB)"),
            suggestion: None,
        });
    }

    let eps = config.diagnostics.ratio_epsilon;
    if !(eps.is_finite() && eps > 0.0) {
        errors.push(format!("diagnostics.ratio_epsilon = {eps} must be > 0"));
    }

    let tie = config.regression.r2_tie_tolerance;
    if !(tie.is_finite() && (0.0..0.1).contains(&tie)) {
        errors.push(format!(
            "regression.r2_tie_tolerance = {tie} must be in [0, 0.1)"
        ));
    }

    let f = &config.forecast;
    if !(f.days_per_year.is_finite() && f.days_per_year > 0.0) {
        errors.push(format!(
            "forecast.days_per_year = {} must be > 0",
            f.days_per_year
        ));
    } else if !(360.0..=366.0).contains(&f.days_per_year) {
        warnings.push(ValidationWarning {
            field: "forecast.days_per_year".to_string(),
            message: format!(
                "forecast.days_per_year = {:.2} is outside calendar range (360-366)",
                f.days_per_year
            ),
            suggestion: None,
        });
    }
    if !(f.pressure_tolerance_psi.is_finite() && f.pressure_tolerance_psi > 0.0) {
        errors.push(format!(
            "forecast.pressure_tolerance_psi = {} must be > 0",
            f.pressure_tolerance_psi
        ));
    }
    if f.steps_per_year > 365 {
        warnings.push(ValidationWarning {
            field: "forecast.steps_per_year".to_string(),
            message: format!(
                "forecast.steps_per_year = {} is finer than daily",
                f.steps_per_year
            ),
            suggestion: None,
        });
    }

    let c = &config.consistency;
    for (name, value) in [
        ("consistency.warning_fraction", c.warning_fraction),
        ("consistency.error_fraction", c.error_fraction),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            errors.push(format!("{name} = {value} must be in (0, 1]"));
        }
    }
    for (name, value) in [
        ("consistency.warning_weight", c.warning_weight),
        ("consistency.error_weight", c.error_weight),
    ] {
        if value < 0.0 {
            errors.push(format!("{name} = {value} cannot be negative"));
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
