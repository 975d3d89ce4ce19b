//! Chaincode-style entry point: a function name plus string arguments.
//!
//! | Function | Arguments |
//! |---|---|
//! | `InsertDataOffer` / `UpdateDataOffer` | offer JSON |
//! | `GetOffer` | offer id |
//! | `GetAllOffers` | creator (optional) |
//! | `CreateOfferRequest` / `CreateAndAcceptOfferRequest` | request JSON |
//! | `AcceptOfferRequest` | offer id, request id, `true`/`false` |
//! | `GetOfferRequestByID` | request id |
//! | `GetOfferRequestByOfferID` | offer id |
//! | `GetEscrow` | escrow id |
//! | `InsertDataHash` (alias `AppendDeliveryHash`) | offer id, hash id, hash, filename, entry date, log id (optional) |
//! | `GetDataHashByAgreementID` | agreement id |
//! | `GetAgreementByID` | agreement id |
//! | `GetAllAgreements` / `GetTotalCost` | provider, consumer, `$or`/`$and` (optional) |
//! | `RevokeAgreement` | agreement id, `true` if the provider revokes |
//! | `ReleaseEscrow` | escrow id, cost id |
//! | `FalsifyClaim` / `FalsifyClaim2` | offer id, comma separated hashes, agreement id, cost id |
//! | `LatencyClaim` | offer id, agreement id, cost id |
//!
//! `FalsifyClaim2` settles all-or-nothing; `FalsifyClaim` prorates.

use datamarket_ingress::DeliveryProof;
use datamarket_ledger::WorldState;
use datamarket_settlement::{FalsifyClaim, FalsifyPolicy};
use datamarket_types::{DataMarketError, HashId, HashLogId, OfferId, Result};
use serde::Serialize;
use serde_json::Value;

use crate::{
    market::{DataMarket, Invocation},
    views::{PartyFilter, PartyMatch},
};

fn arity<'a, const N: usize>(function: &str, args: &'a [String]) -> Result<[&'a str; N]> {
    if args.len() != N {
        return Err(DataMarketError::malformed(format!(
            "{function} takes {N} argument(s), got {}",
            args.len()
        )));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

fn flag(function: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(DataMarketError::malformed(format!(
            "{function}: expected true or false, got {other:?}"
        ))),
    }
}

/// Split a comma separated hash list, dropping blanks.
///
/// Blank entries are ignored on purpose rather than counted as unlogged hashes.
fn hash_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn party_filter(function: &str, args: &[String]) -> Result<PartyFilter> {
    let (provider, consumer, op) = match args {
        [p, c] => (p, c, ""),
        [p, c, op] => (p, c, op.as_str()),
        _ => {
            return Err(DataMarketError::malformed(format!(
                "{function} takes provider, consumer and an optional operator, got {} argument(s)",
                args.len()
            )));
        }
    };
    Ok(PartyFilter::new(provider, consumer, PartyMatch::from_operator(op)?))
}

fn json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Route `function` to the matching [`DataMarket`] operation.
///
/// # Errors
/// `MalformedInput` for an unknown function or wrong arguments, otherwise
/// whatever the operation returns.
pub fn invoke<S: WorldState>(
    market: &DataMarket<S>,
    inv: &Invocation<'_>,
    function: &str,
    args: &[String],
) -> Result<Value> {
    match function {
        "InsertDataOffer" => {
            let [payload] = arity(function, args)?;
            json(market.insert_offer(inv, payload)?)
        }
        "UpdateDataOffer" => {
            let [payload] = arity(function, args)?;
            json(market.update_offer(inv, payload)?)
        }
        "GetOffer" => {
            let [offer_id] = arity(function, args)?;
            json(market.get_offer(inv, offer_id)?)
        }
        "GetAllOffers" => {
            let creator = match args {
                [] => None,
                [creator] => Some(creator.as_str()),
                _ => return Err(DataMarketError::malformed("GetAllOffers takes at most a creator")),
            };
            json(market.list_offers(inv, creator)?)
        }
        "CreateOfferRequest" => {
            let [payload] = arity(function, args)?;
            json(market.create_offer_request(inv, payload)?)
        }
        "CreateAndAcceptOfferRequest" => {
            let [payload] = arity(function, args)?;
            json(market.create_and_accept_offer_request(inv, payload)?)
        }
        "AcceptOfferRequest" => {
            let [offer_id, request_id, accepted] = arity(function, args)?;
            let accepted = flag(function, accepted)?;
            json(market.accept_offer_request(inv, offer_id, request_id, accepted)?)
        }
        "GetOfferRequestByID" => {
            let [request_id] = arity(function, args)?;
            json(market.get_offer_request(inv, request_id)?)
        }
        "GetOfferRequestByOfferID" => {
            let [offer_id] = arity(function, args)?;
            json(market.get_offer_requests_by_offer(inv, offer_id)?)
        }
        "GetEscrow" => {
            let [escrow_id] = arity(function, args)?;
            json(market.get_escrow(inv, escrow_id)?)
        }
        "InsertDataHash" | "AppendDeliveryHash" => {
            let (fields, log_id) = match args.len() {
                5 => (&args[..], None),
                6 => (&args[..5], Some(HashLogId::from(args[5].as_str()))),
                n => {
                    return Err(DataMarketError::malformed(format!(
                        "{function} takes 5 or 6 arguments, got {n}"
                    )));
                }
            };
            let [offer_id, hash_id, hash, filename, entry_date] = arity(function, fields)?;
            let proof = DeliveryProof {
                offer_id: OfferId::from(offer_id),
                hash_id: HashId::from(hash_id),
                hash: hash.to_string(),
                filename: filename.to_string(),
                entry_date: entry_date.to_string(),
                log_id,
            };
            json(market.append_delivery_hash(inv, proof)?)
        }
        "GetDataHashByAgreementID" => {
            let [agreement_id] = arity(function, args)?;
            json(market.agreement_hashes(inv, agreement_id)?)
        }
        "GetAgreementByID" => {
            let [agreement_id] = arity(function, args)?;
            json(market.get_agreement(inv, agreement_id)?)
        }
        "GetAllAgreements" => json(market.agreements_for_party(inv, &party_filter(function, args)?)?),
        "GetTotalCost" => json(market.costs_for_party(inv, &party_filter(function, args)?)?),
        "RevokeAgreement" => {
            let [agreement_id, is_provider] = arity(function, args)?;
            let is_provider = flag(function, is_provider)?;
            json(market.revoke_agreement(inv, agreement_id, is_provider)?)
        }
        "ReleaseEscrow" => {
            let [escrow_id, cost_id] = arity(function, args)?;
            json(market.release_escrow(inv, escrow_id, cost_id)?)
        }
        "FalsifyClaim" | "FalsifyClaim2" => {
            let [offer_id, hashes, agreement_id, cost_id] = arity(function, args)?;
            let claimed = hash_list(hashes);
            let policy = if function == "FalsifyClaim2" {
                FalsifyPolicy::AllOrNothing
            } else {
                FalsifyPolicy::Prorated
            };
            let claim = FalsifyClaim {
                offer_id,
                agreement_id,
                claimed_hashes: &claimed,
                cost_id,
                policy,
            };
            json(market.falsify_claim(inv, &claim)?)
        }
        "LatencyClaim" => {
            let [offer_id, agreement_id, cost_id] = arity(function, args)?;
            json(market.latency_claim(inv, offer_id, agreement_id, cost_id)?)
        }
        other => Err(DataMarketError::malformed(format!("unknown function {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use datamarket_ledger::{MemoryLedger, StaticIdentity};
    use datamarket_types::{EngineConfig, LedgerTime};

    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn market() -> DataMarket<MemoryLedger> {
        DataMarket::new(MemoryLedger::new(), EngineConfig::default()).unwrap()
    }

    fn call(
        m: &DataMarket<MemoryLedger>,
        org: &str,
        at: &str,
        function: &str,
        a: &[&str],
    ) -> Result<Value> {
        let identity = StaticIdentity::local(org);
        let inv = Invocation::new(&identity, LedgerTime::parse(at).unwrap().to_datetime());
        invoke(m, &inv, function, &args(a))
    }

    #[test]
    fn hash_lists_are_trimmed() {
        assert_eq!(hash_list(" a, b ,,c,"), args(&["a", "b", "c"]));
        assert!(hash_list(" , ").is_empty());
    }

    #[test]
    fn flags() {
        assert!(flag("f", "TRUE").unwrap());
        assert!(!flag("f", " false").unwrap());
        assert!(flag("f", "yes").is_err());
    }

    #[test]
    fn unknown_function_and_arity_are_malformed() {
        let m = market();
        for (function, a) in [
            ("Nope", vec![]),
            ("GetOffer", vec![]),
            ("ReleaseEscrow", vec!["e-1"]),
            ("InsertDataHash", vec!["o-1", "h-1"]),
            ("GetTotalCost", vec!["alice"]),
        ] {
            let err = call(&m, "Org1MSP", "2024-03-01 07:00", function, &a).unwrap_err();
            assert!(
                matches!(err, DataMarketError::MalformedInput { .. }),
                "{function}: {err}"
            );
        }
    }

    #[test]
    fn offer_round_trip_through_dispatcher() {
        let m = market();
        let offer = r#"{"id": "o-1", "creator": "alice", "price": "300", "deposit": "50"}"#;
        let receipt = call(&m, "Org1MSP", "2024-03-01 07:00", "InsertDataOffer", &[offer]).unwrap();
        assert_eq!(receipt["message"], "Offer ID: o-1");

        let fetched = call(&m, "Org2MSP", "2024-03-01 07:05", "GetOffer", &["o-1"]).unwrap();
        assert_eq!(fetched["creator"], "alice");
        assert_eq!(fetched["owner_org"], "Org1MSP");

        let all = call(&m, "Org2MSP", "2024-03-01 07:05", "GetAllOffers", &[]).unwrap();
        assert_eq!(all.as_array().map(Vec::len), Some(1));
    }
}
