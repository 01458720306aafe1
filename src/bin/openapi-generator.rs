//! Prints the OpenAPI document of the service as pretty JSON.

use team_toss_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), serde_json::Error> {
    let doc = ApiDoc::openapi();
    println!("{}", doc.to_pretty_json()?);
    Ok(())
}
