//! HTTP client for a remote QUBO sampler service.
//!
//! Submits the sparse model as JSON to `POST {endpoint}/sample` and reads
//! back a dense bit vector plus the reported energy. The blocking client is
//! intentional: [`crate::solver::solve`] already runs on a blocking thread.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::qubo::Qubo;
use crate::solver::{Sample, Sampler, SamplerError, SolverConfig};

/// Environment variable naming the sampler endpoint.
pub const SAMPLER_URL_ENV: &str = "QUBO_SAMPLER_URL";

/// Default sampler endpoint.
const DEFAULT_ENDPOINT: &str = "http://localhost:8998";

/// Connection timeout for the sampler service.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Wall-time allowance beyond the sampler's own time limit.
const REQUEST_GRACE_SECS: u64 = 30;

/// Request timeout when no time limit is configured.
const FALLBACK_TIMEOUT_SECS: u64 = 180;

/// Sampler backed by a remote HTTP service.
pub struct HttpSampler {
    endpoint: String,
}

impl HttpSampler {
    /// Creates a sampler for an explicit endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a sampler from `QUBO_SAMPLER_URL`, falling back to
    /// `http://localhost:8998`.
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var(SAMPLER_URL_ENV).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Self::new(endpoint)
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Sampler for HttpSampler {
    fn name(&self) -> &str {
        "remote"
    }

    fn sample(&self, qubo: &Qubo, config: &SolverConfig) -> Result<Sample, SamplerError> {
        let request = SampleRequest {
            label: config.label.as_deref(),
            time_limit_secs: config.time_limit.map(|limit| limit.as_secs()),
            num_variables: qubo.n_variables(),
            offset: qubo.offset(),
            terms: qubo.terms().map(|((i, j), value)| (i, j, value)).collect(),
        };

        debug!(
            endpoint = %self.endpoint,
            variables = request.num_variables,
            terms = request.terms.len(),
            "Submitting sample request"
        );

        let timeout = config
            .time_limit
            .map(|limit| limit + Duration::from_secs(REQUEST_GRACE_SECS))
            .unwrap_or(Duration::from_secs(FALLBACK_TIMEOUT_SECS));

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .user_agent(concat!("qubo-scheduling/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SamplerError::Network(e.to_string()))?;

        let response = client
            .post(sample_url(&self.endpoint))
            .json(&request)
            .send()
            .map_err(|e| {
                error!("Sample request failed: {}", e);
                SamplerError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(if status.is_client_error() {
                SamplerError::Rejected(format!("status {}: {}", status, body.trim()))
            } else {
                SamplerError::Network(format!("sampler returned status {}", status))
            });
        }

        let payload: SampleResponse = response
            .json()
            .map_err(|e| SamplerError::Protocol(e.to_string()))?;

        let bits = bits_from_assignment(&payload.assignment)?;
        info!(
            energy = payload.energy,
            set_bits = bits.len(),
            "Received sample"
        );

        Ok(Sample {
            bits,
            energy: payload.energy,
        })
    }
}

/// Model submission payload. Diagonal (linear) terms use `i == j` triples;
/// the offset rides along so the backend can report absolute energies.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_limit_secs: Option<u64>,
    num_variables: usize,
    offset: f64,
    terms: Vec<(usize, usize, f64)>,
}

#[derive(Debug, Deserialize)]
struct SampleResponse {
    /// One bit per variable index. A vector longer than the submitted model
    /// is passed through and caught by the decoder as a foreign index.
    assignment: Vec<u8>,
    energy: f64,
}

fn sample_url(endpoint: &str) -> String {
    format!("{}/sample", endpoint.trim_end_matches('/'))
}

fn bits_from_assignment(assignment: &[u8]) -> Result<BTreeMap<usize, u8>, SamplerError> {
    let mut bits = BTreeMap::new();
    for (index, &value) in assignment.iter().enumerate() {
        match value {
            0 => {}
            1 => {
                bits.insert(index, 1u8);
            }
            other => {
                return Err(SamplerError::Protocol(format!(
                    "assignment bit {} has non-binary value {}",
                    index, other
                )));
            }
        }
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Constraint;
    use crate::domain::Problem;

    #[test]
    fn test_sample_url_normalizes_trailing_slash() {
        assert_eq!(
            sample_url("http://localhost:8998/"),
            "http://localhost:8998/sample"
        );
        assert_eq!(
            sample_url("http://sampler.internal"),
            "http://sampler.internal/sample"
        );
    }

    #[test]
    fn test_request_serializes_camel_case_triples() {
        let problem = Problem::builder("wire", 2, 1)
            .with_constraint(Constraint::slot_coverage(1.0, 1.0))
            .build()
            .unwrap();
        let qubo = problem.build_qubo().unwrap();

        let request = SampleRequest {
            label: None,
            time_limit_secs: Some(30),
            num_variables: qubo.n_variables(),
            offset: qubo.offset(),
            terms: qubo.terms().map(|((i, j), value)| (i, j, value)).collect(),
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["numVariables"], 2);
        assert_eq!(value["timeLimitSecs"], 30);
        assert!(value.get("label").is_none());
        // Diagonal lambda * (1 - 2T) = -1, pair 2 * lambda = 2, offset T^2.
        assert_eq!(value["offset"], 1.0);
        let terms = value["terms"].as_array().unwrap();
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[0], serde_json::json!([0, 0, -1.0]));
        assert_eq!(terms[1], serde_json::json!([0, 1, 2.0]));
        assert_eq!(terms[2], serde_json::json!([1, 1, -1.0]));
    }

    #[test]
    fn test_response_parses_assignment_and_energy() {
        let payload: SampleResponse =
            serde_json::from_str(r#"{"assignment":[0,1,0,1],"energy":-1.5}"#).unwrap();
        assert_eq!(payload.assignment, vec![0, 1, 0, 1]);
        assert_eq!(payload.energy, -1.5);

        let bits = bits_from_assignment(&payload.assignment).unwrap();
        assert_eq!(bits, BTreeMap::from([(1, 1u8), (3, 1u8)]));
    }

    #[test]
    fn test_non_binary_assignment_is_a_protocol_error() {
        let result = bits_from_assignment(&[0, 1, 2]);
        assert!(matches!(result, Err(SamplerError::Protocol(_))));
    }
}
