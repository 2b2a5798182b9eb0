//! TOML-deserializable mutation-parameter files, validated and converted into
//! the log-space [`MutatorParams`] the Viterbi engine actually scores with.
//!
//! Mirrors the `toml` + `serde(derive)` configuration-loading pattern used
//! throughout `wasmtime`'s crates: a plain-probability `serde::Deserialize`
//! struct that gets validated once at load time, then converted into the
//! internal representation the hot path uses.

use serde::Deserialize;
use std::path::Path;

use crate::error::CodecError;
use crate::logprob::LogProb;
use crate::mutator::MutatorParams;

const TOLERANCE: f64 = 1e-6;

/// On-disk representation of a mutation-parameter file.
///
/// ```toml
/// end = 0.01
/// deletion = 0.02
/// duplication = [0.01, 0.002]
///
/// [[substitution]]
/// true_base = "A"
/// probabilities = { A = 0.94, C = 0.02, G = 0.02, T = 0.02 }
/// # ... one row per base
/// ```
#[derive(Debug, Deserialize)]
pub struct MutatorParamsFile {
    substitution: Vec<SubstitutionRow>,
    deletion: f64,
    #[serde(default)]
    duplication: Vec<f64>,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct SubstitutionRow {
    true_base: char,
    probabilities: BaseProbabilities,
}

#[derive(Debug, Deserialize)]
struct BaseProbabilities {
    #[serde(rename = "A")]
    a: f64,
    #[serde(rename = "C")]
    c: f64,
    #[serde(rename = "G")]
    g: f64,
    #[serde(rename = "T")]
    t: f64,
}

impl MutatorParamsFile {
    pub fn load(path: impl AsRef<Path>) -> Result<MutatorParamsFile, CodecError> {
        let text = fs_err::read_to_string(path).map_err(|e| CodecError::Io(e.into()))?;
        toml::from_str(&text).map_err(|e| CodecError::InvalidConfig(e.to_string()))
    }

    /// Validate row sums and convert to log-space [`MutatorParams`].
    pub fn into_mutator_params(self) -> Result<MutatorParams, CodecError> {
        if self.substitution.len() != 4 {
            return Err(CodecError::InvalidConfig(format!(
                "expected 4 substitution rows (one per base), got {}",
                self.substitution.len()
            )));
        }

        let mut sub = [[LogProb::NEG_INFINITY; 4]; 4];
        for row in &self.substitution {
            let a = base_index(row.true_base)?;
            let probs = [
                row.probabilities.a,
                row.probabilities.c,
                row.probabilities.g,
                row.probabilities.t,
            ];
            let row_total: f64 = probs.iter().sum::<f64>() + self.deletion + self.duplication.iter().sum::<f64>();
            if (row_total - 1.0).abs() > TOLERANCE {
                return Err(CodecError::InvalidConfig(format!(
                    "row for base {} sums to {}, expected 1.0 (substitution + deletion + duplication)",
                    row.true_base, row_total
                )));
            }
            for (b, &p) in probs.iter().enumerate() {
                sub[a][b] = LogProb::from_prob(p);
            }
        }

        let dup = self
            .duplication
            .iter()
            .map(|&p| LogProb::from_prob(p))
            .collect();

        Ok(MutatorParams::new(
            sub,
            LogProb::from_prob(self.deletion),
            dup,
            LogProb::from_prob(self.end),
        ))
    }
}

fn base_index(c: char) -> Result<usize, CodecError> {
    match c.to_ascii_uppercase() {
        'A' => Ok(0),
        'C' => Ok(1),
        'G' => Ok(2),
        'T' => Ok(3),
        other => Err(CodecError::InvalidConfig(format!(
            "unrecognized base '{}' in substitution row",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> String {
        let mut s = String::new();
        s.push_str("deletion = 0.02\nduplication = [0.01]\nend = 0.01\n");
        for (b, other) in [('A', 0.94), ('C', 0.94), ('G', 0.94), ('T', 0.94)] {
            s.push_str("[[substitution]]\n");
            s.push_str(&format!("true_base = \"{}\"\n", b));
            let rest = (1.0 - other - 0.03) / 3.0;
            s.push_str(&format!(
                "probabilities = {{ A = {a}, C = {c}, G = {g}, T = {t} }}\n",
                a = if b == 'A' { other } else { rest },
                c = if b == 'C' { other } else { rest },
                g = if b == 'G' { other } else { rest },
                t = if b == 'T' { other } else { rest },
            ));
        }
        s
    }

    #[test]
    fn well_formed_file_parses_and_converts() {
        let toml_text = sample_toml();
        let file: MutatorParamsFile = toml::from_str(&toml_text).unwrap();
        let params = file.into_mutator_params().unwrap();
        assert_eq!(params.max_dup_len(), 1);
    }

    #[test]
    fn wrong_row_count_is_rejected() {
        let file = MutatorParamsFile {
            substitution: vec![],
            deletion: 0.0,
            duplication: vec![],
            end: 1.0,
        };
        assert!(file.into_mutator_params().is_err());
    }
}
