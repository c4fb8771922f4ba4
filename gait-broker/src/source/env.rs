// gait-broker/src/source/env.rs
// ============================================================================
// Module: Environment Credential Source
// Description: Resolves `env:<VAR_NAME>` references from process environment.
// Purpose: Let an operator provision a broker credential through process
// environment without a file or network round trip.
// Dependencies: std::env
// ============================================================================

use crate::source::CredentialSource;
use crate::source::SourceError;

/// Resolves credential references by reading a named environment variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialSource;

impl CredentialSource for EnvCredentialSource {
    fn resolve(&self, reference: &str, _scopes: &[String]) -> Result<String, SourceError> {
        std::env::var(reference).map_err(|_err| SourceError::MissingEnvVar(reference.to_string()))
    }
}
