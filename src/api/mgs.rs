//! MGS storefront scraping: search listings and product pages

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use super::{require_env, ApiError, ProductRecord};
use crate::config::MgsConfig;

const DETAIL_PATH: &str = "/product/product_detail/";

/// Browser-like agent; the storefront serves an empty shell to unknown clients
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Read `MGS_AFFILIATE_ID`
pub fn affiliate_id_from_env() -> Result<String, ApiError> {
    require_env("MGS_AFFILIATE_ID")
}

/// Append `af={id}` to a product URL
pub fn affiliate_url(link: &str, affiliate_id: &str) -> String {
    let separator = if link.contains('?') { '&' } else { '?' };
    format!("{}{}af={}", link, separator, affiliate_id)
}

/// `.../product/product_detail/ABC-123/` -> `ABC-123`
pub fn content_id_from_url(link: &str) -> Option<String> {
    let (_, rest) = link.split_once(DETAIL_PATH)?;
    let id = rest.split(['/', '?']).next()?;
    (!id.is_empty()).then(|| id.to_string())
}

fn selector(s: &str) -> Result<Selector, ApiError> {
    Selector::parse(s).map_err(|e| ApiError::Selector(e.to_string()))
}

fn text_or_none(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().map(str::trim).collect::<Vec<_>>().join("")
}

fn absolutize(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Products on one search result page, in page order.
///
/// Items are `.product_list_item` blocks; pages without them fall back to
/// bare product-detail links. Ranks are left at zero for the caller.
pub fn parse_listing(
    html: &str,
    base_url: &str,
    affiliate_id: &str,
    keyword: &str,
) -> Result<Vec<ProductRecord>, ApiError> {
    let base = Url::parse(base_url).map_err(|_| ApiError::InvalidUrl(base_url.to_string()))?;
    let document = Html::parse_document(html);
    let item_sel = selector(".product_list_item")?;
    let link_sel = selector("a[href*='/product/product_detail/']")?;

    let mut items: Vec<ElementRef> = document.select(&item_sel).collect();
    if items.is_empty() {
        for link in document.select(&link_sel) {
            let Some(parent) = link.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            if !items.iter().any(|i| i.id() == parent.id()) {
                items.push(parent);
            }
        }
    }

    let mut records = Vec::new();
    for item in items {
        if let Some(record) = parse_item(item, &base, affiliate_id, keyword)? {
            records.push(record);
        }
    }
    Ok(records)
}

fn parse_item(
    item: ElementRef,
    base: &Url,
    affiliate_id: &str,
    keyword: &str,
) -> Result<Option<ProductRecord>, ApiError> {
    let title_sel = selector("a.title")?;
    let link_sel = selector("a[href*='/product/product_detail/']")?;
    let span_sel = selector("span")?;
    let img_sel = selector("img")?;
    let date_sel = selector(".date, .release-date, time")?;

    let is_detail = |a: &ElementRef| {
        a.value()
            .attr("href")
            .map(|h| h.contains(DETAIL_PATH))
            .unwrap_or(false)
    };
    let title_link = item.select(&title_sel).find(is_detail);
    let Some(link) = title_link.or_else(|| item.select(&link_sel).next()) else {
        return Ok(None);
    };
    let Some(href) = link.value().attr("href") else {
        return Ok(None);
    };
    let url = absolutize(base, href);

    // Title text minus badge spans
    let mut title = String::new();
    if let Some(title_link) = title_link {
        title = element_text(title_link);
        for span in title_link.select(&span_sel) {
            let badge = element_text(span);
            if !badge.is_empty() {
                title = title.replace(&badge, "");
            }
        }
        title = title.trim().to_string();
    }
    let image = item.select(&img_sel).next();
    if title.is_empty() {
        title = element_text(link);
    }
    if title.is_empty() {
        title = image
            .and_then(|img| img.value().attr("alt"))
            .unwrap_or_default()
            .trim()
            .to_string();
    }
    if title.is_empty() {
        return Ok(None);
    }

    let image_url = image
        .and_then(|img| {
            let attrs = img.value();
            attrs
                .attr("src")
                .or_else(|| attrs.attr("data-src"))
                .or_else(|| attrs.attr("data-original"))
        })
        .map(|src| absolutize(base, src))
        .unwrap_or_default();

    let release_date = item
        .select(&date_sel)
        .next()
        .and_then(|d| text_or_none(element_text(d)))
        .unwrap_or_default();

    Ok(Some(ProductRecord {
        content_id: content_id_from_url(&url).unwrap_or_default(),
        title,
        affiliate_url: affiliate_url(&url, affiliate_id),
        url,
        image_url,
        release_date,
        service: "MGS".to_string(),
        search_keyword: keyword.to_string(),
        ..Default::default()
    }))
}

/// Fields read from a product page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDetail {
    pub actress: Vec<String>,
    pub genre: Vec<String>,
    pub maker: String,
    pub release_date: String,
    pub image_url: String,
}

impl ProductDetail {
    /// Fill empty fields of `record`
    pub fn merge_into(self, record: &mut ProductRecord) {
        if record.actress.is_empty() {
            record.actress = self.actress;
        }
        if record.genre.is_empty() {
            record.genre = self.genre;
        }
        if record.maker.is_empty() {
            record.maker = self.maker;
        }
        if !self.release_date.is_empty() {
            record.release_date = self.release_date;
        }
        if record.image_url.is_empty() {
            record.image_url = self.image_url;
        }
    }
}

/// Read the details table of a product page (`<th>出演：</th><td>...</td>` rows)
pub fn parse_detail(html: &str) -> Result<ProductDetail, ApiError> {
    let document = Html::parse_document(html);
    let row_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;
    let a_sel = selector("a")?;
    let image_sel = selector("a#EnlargeImage, meta[property='og:image']")?;

    let mut detail = ProductDetail::default();
    for row in document.select(&row_sel) {
        let (Some(th), Some(td)) = (row.select(&th_sel).next(), row.select(&td_sel).next()) else {
            continue;
        };
        let label = element_text(th);
        let label = label.trim_end_matches(['：', ':']);
        let links: Vec<String> = td
            .select(&a_sel)
            .filter_map(|a| text_or_none(element_text(a)))
            .collect();
        let values = if links.is_empty() {
            text_or_none(element_text(td)).into_iter().collect()
        } else {
            links
        };

        match label {
            "出演" => detail.actress = values,
            "ジャンル" => detail.genre = values,
            "メーカー" => detail.maker = values.into_iter().next().unwrap_or_default(),
            "配信開始日" | "発売日" => {
                detail.release_date = values
                    .into_iter()
                    .next()
                    .map(|d| d.replace('/', "-"))
                    .unwrap_or_default()
            }
            _ => {}
        }
    }

    if let Some(el) = document.select(&image_sel).next() {
        let attrs = el.value();
        detail.image_url = attrs
            .attr("href")
            .or_else(|| attrs.attr("content"))
            .unwrap_or_default()
            .to_string();
    }

    Ok(detail)
}

/// HTTP side of the scraper: age-check cookie, search URLs, page fetches
pub struct MgsClient {
    client: reqwest::Client,
    config: MgsConfig,
}

impl MgsClient {
    pub fn new(config: MgsConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("adc=1"));
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Newest-first search results for `keyword`
    pub fn search_url(&self, keyword: &str, page: u32) -> Result<Url, ApiError> {
        let endpoint = format!(
            "{}/search/search.php",
            self.config.base_url.trim_end_matches('/')
        );
        Url::parse_with_params(
            &endpoint,
            &[
                ("sort", "new".to_string()),
                ("page", page.to_string()),
                ("search_word", keyword.to_string()),
            ],
        )
        .map_err(|_| ApiError::InvalidUrl(endpoint))
    }

    pub async fn fetch_page(&self, url: &str) -> Result<String, ApiError> {
        tracing::info!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, body));
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
<html><body>
<div class="rank_list">
  <ul>
    <li class="product_list_item">
      <a href="/product/product_detail/ABC-123/"><img src="/img/abc123.jpg" alt="alt title"></a>
      <a class="title" href="/product/product_detail/ABC-123/">Summer Drama <span>NEW</span></a>
      <p class="date">2025/12/01</p>
    </li>
    <li class="product_list_item">
      <a href="https://www.mgstage.com/product/product_detail/XYZ-9/?ref=list"><img data-src="https://cdn.example.com/xyz.jpg" alt="Second Story"></a>
    </li>
    <li class="product_list_item">
      <a href="/monthly/">Not a product</a>
    </li>
  </ul>
</div>
</body></html>
"#;

    const DETAIL: &str = r#"
<html><head><meta property="og:image" content="https://cdn.example.com/og.jpg"></head>
<body>
<div class="detail_data"><table>
  <tr><th>出演：</th><td><a href="/a/1">Actress One</a><a href="/a/2">Actress Two</a></td></tr>
  <tr><th>メーカー：</th><td><a href="/m/1">Maker Co</a></td></tr>
  <tr><th>配信開始日：</th><td>2025/11/20</td></tr>
  <tr><th>ジャンル：</th><td><a>ドラマ</a> <a>人妻</a></td></tr>
  <tr><th>品番：</th><td>ABC-123</td></tr>
</table></div>
</body></html>
"#;

    #[test]
    fn test_parse_listing() {
        let records = parse_listing(LISTING, "https://www.mgstage.com", "AFF", "ドラマ").unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.content_id, "ABC-123");
        assert_eq!(first.title, "Summer Drama");
        assert_eq!(first.url, "https://www.mgstage.com/product/product_detail/ABC-123/");
        assert_eq!(
            first.affiliate_url,
            "https://www.mgstage.com/product/product_detail/ABC-123/?af=AFF"
        );
        assert_eq!(first.image_url, "https://www.mgstage.com/img/abc123.jpg");
        assert_eq!(first.release_date, "2025/12/01");
        assert_eq!(first.service, "MGS");
        assert_eq!(first.search_keyword, "ドラマ");

        let second = &records[1];
        assert_eq!(second.content_id, "XYZ-9");
        assert_eq!(second.title, "Second Story");
        assert_eq!(second.image_url, "https://cdn.example.com/xyz.jpg");
        assert!(second.affiliate_url.ends_with("?ref=list&af=AFF"));
    }

    #[test]
    fn test_parse_listing_without_item_blocks() {
        let html = r#"<div><p><a href="/product/product_detail/QQQ-1/">Bare Link</a></p></div>"#;
        let records = parse_listing(html, "https://www.mgstage.com", "AFF", "k").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content_id, "QQQ-1");
        assert_eq!(records[0].title, "Bare Link");
    }

    #[test]
    fn test_parse_detail() {
        let detail = parse_detail(DETAIL).unwrap();
        assert_eq!(detail.actress, vec!["Actress One", "Actress Two"]);
        assert_eq!(detail.maker, "Maker Co");
        assert_eq!(detail.release_date, "2025-11-20");
        assert_eq!(detail.genre, vec!["ドラマ", "人妻"]);
        assert_eq!(detail.image_url, "https://cdn.example.com/og.jpg");

        let mut record = ProductRecord {
            image_url: "kept.jpg".to_string(),
            ..Default::default()
        };
        detail.merge_into(&mut record);
        assert_eq!(record.maker, "Maker Co");
        assert_eq!(record.image_url, "kept.jpg");
    }

    #[test]
    fn test_url_helpers() {
        assert_eq!(affiliate_url("https://x/p/", "A1"), "https://x/p/?af=A1");
        assert_eq!(affiliate_url("https://x/p/?q=1", "A1"), "https://x/p/?q=1&af=A1");
        assert_eq!(
            content_id_from_url("https://www.mgstage.com/product/product_detail/SIRO-1/?x=1"),
            Some("SIRO-1".to_string())
        );
        assert_eq!(content_id_from_url("https://www.mgstage.com/monthly/"), None);

        let client = MgsClient::new(MgsConfig::default()).unwrap();
        let url = client.search_url("人妻", 2).unwrap();
        assert_eq!(url.path(), "/search/search.php");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
        assert!(pairs.contains(&("search_word".to_string(), "人妻".to_string())));
    }
}
