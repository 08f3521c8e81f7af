//! `snapkit conf get` and `snapkit conf set`.

use super::{fail, parse_assignment, print_json, Session};
use miette::Result;
use serde::Serialize;
use snapkit_core::{Config, Error};
use snapkit_proto::Change;
use std::collections::BTreeMap;

/// Conf command action.
#[derive(Debug, Clone)]
pub enum ConfAction {
    Get { name: String, keys: Vec<String> },
    Set { name: String, values: Vec<String> },
}

/// Conf get result for JSON output.
#[derive(Serialize)]
struct ConfGetResult {
    ok: bool,
    name: String,
    values: BTreeMap<String, serde_json::Value>,
}

/// Conf set result for JSON output.
#[derive(Serialize)]
struct ConfSetResult {
    ok: bool,
    name: String,
    change_id: String,
    change: Change,
}

pub fn run(config: &Config, action: ConfAction, json: bool) -> Result<()> {
    let session = Session::new(config);

    match action {
        ConfAction::Get { name, keys } => {
            let values = match session.client().conf(&name, &keys) {
                Ok(values) => values,
                Err(e) => return fail(e, json),
            };
            if json {
                return print_json(&ConfGetResult {
                    ok: true,
                    name,
                    values,
                });
            }
            for (key, value) in &values {
                println!("{key}={value}");
            }
            Ok(())
        }
        ConfAction::Set { name, values } => {
            let values = match parse_values(&values) {
                Ok(values) => values,
                Err(e) => return fail(e, json),
            };
            let (change_id, change) = match session.coordinator().set_conf(&name, &values) {
                Ok(done) => done,
                Err(e) => return fail(e, json),
            };
            if json {
                return print_json(&ConfSetResult {
                    ok: true,
                    name,
                    change_id,
                    change,
                });
            }
            println!("configured {name} (change {change_id}: {})", change.status);
            Ok(())
        }
    }
}

/// Later assignments to the same key win.
fn parse_values(raw: &[String]) -> Result<BTreeMap<String, serde_json::Value>, Error> {
    raw.iter()
        .map(|item| parse_assignment(item).map_err(Error::InvalidSpec))
        .collect()
}
