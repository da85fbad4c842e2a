//! Writes the OpenAPI specification to stdout.
//!
//! Used by frontend builds to generate typed API clients:
//!
//! ```bash
//! cargo run --package qms-server --bin gen-openapi > openapi.json
//! ```

fn main() {
    println!("{}", qms_server::api::get_openapi_json());
}
