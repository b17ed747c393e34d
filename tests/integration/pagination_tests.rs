use crate::common::*;
use sumi_sift::extract::FieldValue;
use sumi_sift::pagination::PaginationState;
use sumi_sift::run::{RunOptions, ScrapeRequest, ScrapeType, ScrapingStrategy};
use wiremock::MockServer;

async fn mount_catalog(server: &MockServer, pages: u32) {
    for page in 1..=pages {
        let page_path = if page == 1 {
            "/catalog".to_string()
        } else {
            format!("/catalog/page/{}", page)
        };
        let next = (page < pages).then(|| format!("/catalog/page/{}", page + 1));
        mount_page(
            server,
            &page_path,
            list_page(
                &[
                    product(&format!("Item {}a", page), "10.00"),
                    product(&format!("Item {}b", page), "12.50"),
                ],
                next.as_deref(),
            ),
        )
        .await;
    }
}

#[tokio::test]
async fn test_follows_pagination_until_max_pages() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_catalog(&server, 4).await;

    let request = list_request(&format!("{}/catalog", server.uri()), 3);
    let result = orchestrator()
        .run(&request, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.pages_visited, 3);
    assert_eq!(result.pagination_state, PaginationState::LimitReached);
    assert_eq!(result.items.len(), 6);
    assert_eq!(result.total_scraped, 6);
    assert_eq!(hits(&server, "/catalog/page/4").await, 0);

    let first = &result.items[0];
    assert_eq!(
        first.fields.value("title"),
        Some(&FieldValue::Text("Item 1a".to_string()))
    );
    assert_eq!(first.fields.value("price"), Some(&FieldValue::Number(10.0)));
    assert_eq!(
        first.fields.value("link"),
        Some(&FieldValue::Url(format!("{}/p/item-1a", server.uri())))
    );
}

#[tokio::test]
async fn test_pagination_exhausted_on_last_page() {
    let server = MockServer::start().await;
    mount_catalog(&server, 2).await;

    let request = list_request(&format!("{}/catalog", server.uri()), 10);
    let result = orchestrator()
        .run(&request, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.pages_visited, 2);
    assert_eq!(result.items.len(), 4);
    assert_eq!(result.pagination_state, PaginationState::Exhausted);
}

#[tokio::test]
async fn test_explicit_next_page_selector() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/results",
        format!(
            r#"<html><body>{}<nav><a class="older" href="/results/older">Older</a></nav></body></html>"#,
            product("First", "1")
        ),
    )
    .await;
    mount_page(
        &server,
        "/results/older",
        list_page(&[product("Second", "2")], None),
    )
    .await;

    let request = ScrapeRequest::new(
        &format!("{}/results", server.uri()),
        ScrapingStrategy::new(ScrapeType::Search)
            .with_pagination(5)
            .with_item_selector(".product")
            .with_next_page_selector("nav a.older"),
        product_recipe(),
    );
    let result = orchestrator()
        .run(&request, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.pages_visited, 2);
}

#[tokio::test]
async fn test_sitemap_detail_pages() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/sitemap.xml",
        format!(
            "<urlset><url><loc>{base}/p/1</loc></url><url><loc>{base}/p/2</loc></url></urlset>"
        ),
    )
    .await;
    for (id, title) in [(1, "Teapot"), (2, "Kettle")] {
        mount_page(
            &server,
            &format!("/p/{}", id),
            format!(r#"<html><body><h2>{}</h2><span class="price">{}.00</span></body></html>"#, title, id * 10),
        )
        .await;
    }

    let request = ScrapeRequest::new(
        &format!("{}/sitemap.xml", base),
        ScrapingStrategy::new(ScrapeType::Sitemap).with_max_pages(10),
        product_recipe(),
    );
    let result = orchestrator()
        .run(&request, RunOptions::default())
        .await
        .unwrap();

    let titles: Vec<_> = result
        .items
        .iter()
        .filter_map(|i| i.fields.value("title").and_then(FieldValue::as_text))
        .collect();
    assert_eq!(titles, vec!["Teapot", "Kettle"]);
    assert_eq!(result.pages_visited, 2);
    assert_eq!(result.pagination_state, PaginationState::Exhausted);
}
