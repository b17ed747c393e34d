use crate::common::*;
use std::io::Write;
use sumi_sift::config::{load_config_with_hash, load_request};
use sumi_sift::run::{RunOptions, RunOrchestrator};
use sumi_sift::ConfigError;
use tempfile::NamedTempFile;
use wiremock::MockServer;

fn create_temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const CONFIG: &str = r#"
[user-agent]
crawler-name = "TestSifter"
crawler-version = "1.0"
contact-url = "https://example.com/bot"
contact-email = "bot@example.com"

[compliance]
default-crawl-delay-ms = 10

[rate-limit]
initial-delay-ms = 20
min-delay-ms = 10
max-delay-ms = 200

[run]
max-retries = 1
"#;

fn job(target: &str) -> String {
    format!(
        r#"
target-url = "{target}"

[strategy]
scrape-type = "list"
pagination-enabled = true
max-pages = 2

[strategy.selectors]
item = ".product"

[recipe]
name = "products"
description = "Listing cards"

[[recipe.fields]]
name = "title"
selector = "h2"
type = "text"
required = true
post-processing = ["trim", "uppercase"]

[[recipe.fields]]
name = "price"
selector = ".price"
type = "number"
"#
    )
}

#[tokio::test]
async fn test_run_from_config_and_job_files() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/shop",
        list_page(&[product("Mug", "4"), product("Bowl", "6")], None),
    )
    .await;

    let config_file = create_temp_file(CONFIG);
    let job_file = create_temp_file(&job(&format!("{}/shop", server.uri())));

    let (config, hash) = load_config_with_hash(config_file.path()).unwrap();
    assert_eq!(hash.len(), 64);
    assert_eq!(config.run.max_retries, 1);

    let request = load_request(job_file.path()).unwrap();
    assert_eq!(request.recipe.description, "Listing cards");

    let sifter = RunOrchestrator::from_config(config).unwrap();
    let result = sifter.run(&request, RunOptions::default()).await.unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["items"][0]["title"], "MUG");
    assert_eq!(json["items"][1]["price"], 6.0);
}

#[test]
fn test_job_with_bad_selector_rejected() {
    let bad = job("https://shop.example.com/").replace(r#"selector = "h2""#, r#"selector = "h2[[""#);
    let job_file = create_temp_file(&bad);

    let result = load_request(job_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidSelector { .. })));
}
