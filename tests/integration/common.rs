use sumi_sift::config::{
    ComplianceConfig, EngineConfig, QualityConfig, RateLimitConfig, RunConfig, UserAgentConfig,
};
use sumi_sift::extract::{FieldSpec, FieldType, SchemaRecipe};
use sumi_sift::run::{RunOrchestrator, ScrapeRequest, ScrapeType, ScrapingStrategy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER_AGENT: &str = "TestSifter/1.0 (+https://example.com/bot; bot@example.com)";

/// Creates a test configuration with delays short enough for real time
pub fn create_test_config() -> EngineConfig {
    EngineConfig {
        user_agent: UserAgentConfig {
            crawler_name: "TestSifter".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/bot".to_string(),
            contact_email: "bot@example.com".to_string(),
        },
        compliance: ComplianceConfig {
            respect_robots_txt: true,
            default_crawl_delay_ms: 10,
            robots_fetch_retries: 0,
        },
        rate_limit: RateLimitConfig {
            initial_delay_ms: 20,
            min_delay_ms: 10,
            max_delay_ms: 200,
            ..Default::default()
        },
        run: RunConfig {
            max_retries: 2,
            workers: 4,
            request_timeout_secs: 5,
            cancel_grace_ms: 500,
        },
        quality: QualityConfig::default(),
    }
}

pub fn orchestrator() -> RunOrchestrator {
    RunOrchestrator::from_config(create_test_config()).expect("Failed to build orchestrator")
}

pub fn product_recipe() -> SchemaRecipe {
    SchemaRecipe::new(
        "products",
        vec![
            FieldSpec::new("title", "h2", FieldType::Text).required(),
            FieldSpec::new("price", ".price", FieldType::Number),
            FieldSpec::new("link", "a.detail", FieldType::Url),
        ],
    )
}

pub fn list_request(url: &str, max_pages: u32) -> ScrapeRequest {
    ScrapeRequest::new(
        url,
        ScrapingStrategy::new(ScrapeType::List)
            .with_pagination(max_pages)
            .with_item_selector(".product"),
        product_recipe(),
    )
}

pub fn product(title: &str, price: &str) -> String {
    format!(
        r#"<div class="product"><h2>{}</h2><span class="price">${}</span><a class="detail" href="/p/{}">more</a></div>"#,
        title,
        price,
        title.to_lowercase().replace(' ', "-")
    )
}

/// A listing page with the given products and an optional rel=next link
pub fn list_page(products: &[String], next: Option<&str>) -> String {
    let next = next
        .map(|href| format!(r#"<a rel="next" href="{}">Next</a>"#, href))
        .unwrap_or_default();
    format!(
        "<html><head><title>Listing</title></head><body>{}{}</body></html>",
        products.concat(),
        next
    )
}

pub async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Number of requests the server received for `page_path`
pub async fn hits(server: &MockServer, page_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == page_path)
        .count()
}
