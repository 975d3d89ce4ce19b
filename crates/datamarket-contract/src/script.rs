//! Replay of recorded invocations.
//!
//! A script is a JSON document listing invocations in order:
//!
//! ```json
//! { "steps": [
//!     { "org": "Org1MSP", "at": "2024-03-01 07:00", "function": "InsertDataOffer",
//!       "args": [{ "id": "o-1", "creator": "alice", "price": "300", "deposit": "50" }] }
//! ] }
//! ```
//!
//! String arguments are passed through; any other JSON value is passed as
//! its JSON text, so payload documents can be written inline. `host`
//! defaults to `org`.

use datamarket_ledger::{StaticIdentity, WorldState};
use datamarket_types::{DataMarketError, LedgerTime, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    dispatch::invoke,
    market::{DataMarket, Invocation},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Caller organization.
    pub org: String,
    /// Organization of the executing peer.
    #[serde(default)]
    pub host: Option<String>,
    /// Ledger time, `YYYY-MM-DD HH:MM`.
    pub at: String,
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Step {
    fn string_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    fn identity(&self) -> StaticIdentity {
        match &self.host {
            Some(host) => StaticIdentity::new(self.org.as_str(), host.as_str()),
            None => StaticIdentity::local(self.org.as_str()),
        }
    }
}

/// What one step produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: usize,
    pub function: String,
    pub org: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Script {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DataMarketError::malformed(format!("script: {e}")))
    }
}

fn run_step<S: WorldState>(market: &DataMarket<S>, step: &Step) -> Result<Value> {
    let identity = step.identity();
    let at = LedgerTime::parse(&step.at)?;
    let inv = Invocation::new(&identity, at.to_datetime());
    invoke(market, &inv, &step.function, &step.string_args())
}

/// Run every step of `script` against `market`.
///
/// Stops after the first failing step unless `keep_going` is set; the
/// failing step is still reported.
pub fn replay<S: WorldState>(
    market: &DataMarket<S>,
    script: &Script,
    keep_going: bool,
) -> Vec<StepOutcome> {
    let mut outcomes = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let mut outcome = StepOutcome {
            step: index + 1,
            function: step.function.clone(),
            org: step.org.clone(),
            result: None,
            error: None,
        };
        match run_step(market, step) {
            Ok(value) => {
                info!(step = index + 1, function = %step.function, org = %step.org, "step ok");
                outcome.result = Some(value);
            }
            Err(e) => {
                warn!(step = index + 1, function = %step.function, org = %step.org, error = %e, "step failed");
                outcome.error = Some(e.to_string());
            }
        }
        let failed = !outcome.is_ok();
        outcomes.push(outcome);
        if failed && !keep_going {
            break;
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use datamarket_ledger::MemoryLedger;
    use datamarket_types::EngineConfig;
    use serde_json::json;

    use super::*;

    fn market() -> DataMarket<MemoryLedger> {
        DataMarket::new(MemoryLedger::new(), EngineConfig::default()).unwrap()
    }

    fn script(steps: Value) -> Script {
        serde_json::from_value(json!({ "steps": steps })).unwrap()
    }

    #[test]
    fn inline_documents_become_json_text() {
        let step: Step = serde_json::from_value(json!({
            "org": "Org1MSP", "at": "2024-03-01 07:00", "function": "InsertDataOffer",
            "args": [{"id": "o-1"}, "plain", true]
        }))
        .unwrap();
        assert_eq!(step.string_args(), vec![r#"{"id":"o-1"}"#, "plain", "true"]);
    }

    #[test]
    fn stops_at_first_failure_unless_told_otherwise() {
        let s = script(json!([
            {"org": "Org1MSP", "at": "2024-03-01 07:00", "function": "GetOffer", "args": ["o-1"]},
            {"org": "Org1MSP", "at": "2024-03-01 07:00", "function": "InsertDataOffer",
             "args": [{"id": "o-1", "creator": "alice", "price": "300", "deposit": "50"}]},
        ]));
        let m = market();
        let out = replay(&m, &s, false);
        assert_eq!(out.len(), 1);
        assert!(out[0].error.as_deref().unwrap().starts_with("DM_ERR_100"));

        let out = replay(&m, &s, true);
        assert_eq!(out.len(), 2);
        assert!(out[1].is_ok());
        assert_eq!(out[1].result.as_ref().unwrap()["message"], "Offer ID: o-1");
    }

    #[test]
    fn foreign_host_is_unauthorized() {
        let s = script(json!([
            {"org": "Org1MSP", "host": "Org2MSP", "at": "2024-03-01 07:00",
             "function": "InsertDataOffer",
             "args": [{"id": "o-1", "creator": "alice", "price": "300", "deposit": "50"}]},
        ]));
        let out = replay(&market(), &s, false);
        assert!(out[0].error.as_deref().unwrap().starts_with("DM_ERR_200"));
    }

    #[test]
    fn bad_timestamp_fails_the_step() {
        let s = script(json!([
            {"org": "Org1MSP", "at": "tomorrow", "function": "GetAllOffers"},
        ]));
        let out = replay(&market(), &s, false);
        assert!(out[0].error.as_deref().unwrap().starts_with("DM_ERR_500"));
    }

    #[test]
    fn unreadable_script_is_malformed() {
        assert!(matches!(
            Script::from_json_str("{\"steps\": 3}").unwrap_err(),
            DataMarketError::MalformedInput { .. }
        ));
    }
}
