use super::print_json;
use miette::Result;
use serde::Serialize;
use snapkit_core::version::version_string;
use snapkit_core::VERSION;
use snapkit_proto::API_VERSION;

#[derive(Serialize)]
struct VersionResult {
    ok: bool,
    version: &'static str,
    api_version: &'static str,
}

pub fn run(json: bool) -> Result<()> {
    if json {
        return print_json(&VersionResult {
            ok: true,
            version: VERSION,
            api_version: API_VERSION,
        });
    }
    println!("{}", version_string());
    Ok(())
}
