use crate::error::Result;
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://dummyjson.com/products";
pub const PREFETCH_LIMIT: usize = 100;

/// A product as the catalog API returns it. Only the fields used for
/// enrichment are kept.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub id: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProductPage {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductInfo {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub rating: Option<f64>,
}

impl From<Product> for ProductInfo {
    fn from(product: Product) -> Self {
        ProductInfo {
            category: product.category,
            brand: product.brand,
            rating: product.rating,
        }
    }
}

/// Source of product metadata keyed by catalog id.
pub trait Catalog {
    fn product(&self, id: u32) -> Result<Option<ProductInfo>>;
}

#[derive(Debug, Clone, Default)]
pub struct ProductMapping {
    products: HashMap<u32, ProductInfo>,
}

impl ProductMapping {
    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Catalog for ProductMapping {
    fn product(&self, id: u32) -> Result<Option<ProductInfo>> {
        Ok(self.products.get(&id).cloned())
    }
}

pub fn create_product_mapping(products: Vec<Product>) -> ProductMapping {
    let products = products
        .into_iter()
        .filter_map(|p| p.id.map(|id| (id, ProductInfo::from(p))))
        .collect();
    ProductMapping { products }
}

pub struct HttpCatalog {
    client: Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpCatalog {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn fetch_all_products(&self, limit: usize) -> Result<Vec<Product>> {
        let url = format!("{}?limit={}", self.base_url, limit);
        debug!("GET {}", url);
        let page: ProductPage = self.client.get(&url).send()?.error_for_status()?.json()?;
        info!("fetched {} products from catalog", page.products.len());
        Ok(page.products)
    }

    pub fn get_product_by_id(&self, id: u32) -> Result<Option<Product>> {
        let url = format!("{}/{}", self.base_url, id);
        debug!("GET {}", url);
        let response = self.client.get(&url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json()?))
    }

    pub fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        let url = format!("{}/search", self.base_url);
        debug!("GET {} q={}", url, query);
        let page: ProductPage = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(page.products)
    }
}

impl Catalog for HttpCatalog {
    fn product(&self, id: u32) -> Result<Option<ProductInfo>> {
        Ok(self.get_product_by_id(id)?.map(ProductInfo::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    const PAGE: &str = r#"{
        "products": [
            {"id": 1, "title": "Essence Mascara", "category": "beauty",
             "brand": "Essence", "rating": 4.94, "price": 9.99},
            {"id": 2, "title": "Apple", "category": "groceries", "rating": 4.19},
            {"title": "orphan", "category": "misc"}
        ],
        "total": 194,
        "skip": 0,
        "limit": 3
    }"#;

    #[test]
    fn parses_product_page() {
        let page: ProductPage = serde_json::from_str(PAGE).unwrap();

        assert_eq!(page.products.len(), 3);
        assert_eq!(page.products[0].title.as_deref(), Some("Essence Mascara"));
        assert_eq!(page.products[1].brand, None);
        assert_eq!(page.products[2].id, None);
    }

    #[test]
    fn missing_products_array_is_empty() {
        let page: ProductPage = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(page.products.is_empty());
    }

    #[test]
    fn mapping_skips_products_without_id() {
        let page: ProductPage = serde_json::from_str(PAGE).unwrap();
        let mapping = create_product_mapping(page.products);

        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping.product(1).unwrap(),
            Some(ProductInfo {
                category: Some("beauty".into()),
                brand: Some("Essence".into()),
                rating: Some(4.94),
            })
        );
        assert_eq!(mapping.product(2).unwrap().unwrap().brand, None);
        assert_eq!(mapping.product(3).unwrap(), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let catalog =
            HttpCatalog::new("http://localhost:9/products/", Duration::from_secs(1)).unwrap();
        assert_eq!(catalog.base_url, "http://localhost:9/products");
    }

    /// Answers a single request with `status` and `body`, handing back the
    /// request line it received.
    fn serve_once(status: &str, body: &str) -> (HttpCatalog, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/products", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut header = String::new();
            while reader.read_line(&mut header).unwrap() > 2 {
                header.clear();
            }
            reader.get_mut().write_all(response.as_bytes()).unwrap();
            request_line.trim_end().to_string()
        });

        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        (HttpCatalog { client, base_url }, server)
    }

    #[test]
    fn fetch_all_sends_limit() {
        let (catalog, server) = serve_once("200 OK", PAGE);

        let products = catalog.fetch_all_products(PREFETCH_LIMIT).unwrap();

        assert_eq!(products.len(), 3);
        assert_eq!(server.join().unwrap(), "GET /products?limit=100 HTTP/1.1");
    }

    #[test]
    fn product_by_id() {
        let body = r#"{"id": 7, "title": "Lamp", "category": "home-decoration", "rating": 3.1}"#;
        let (catalog, server) = serve_once("200 OK", body);

        let info = catalog.product(7).unwrap().unwrap();

        assert_eq!(info.category.as_deref(), Some("home-decoration"));
        assert_eq!(info.brand, None);
        assert_eq!(info.rating, Some(3.1));
        assert_eq!(server.join().unwrap(), "GET /products/7 HTTP/1.1");
    }

    #[test]
    fn not_found_is_no_product() {
        let body = r#"{"message": "Product with id '999' not found"}"#;
        let (catalog, server) = serve_once("404 Not Found", body);

        assert_eq!(catalog.get_product_by_id(999).unwrap(), None);
        assert_eq!(server.join().unwrap(), "GET /products/999 HTTP/1.1");
    }

    #[test]
    fn server_error_is_an_error() {
        let (catalog, server) = serve_once("500 Internal Server Error", "{}");

        let result = catalog.product(3);

        assert!(matches!(result, Err(Error::Http(_))));
        server.join().unwrap();
    }

    #[test]
    fn failed_prefetch_is_an_error() {
        let (catalog, server) = serve_once("503 Service Unavailable", "{}");

        assert!(matches!(
            catalog.fetch_all_products(PREFETCH_LIMIT),
            Err(Error::Http(_))
        ));
        server.join().unwrap();
    }

    #[test]
    fn search_sends_query() {
        let (catalog, server) = serve_once("200 OK", PAGE);

        let products = catalog.search_products("phone").unwrap();

        assert_eq!(products.len(), 3);
        assert_eq!(server.join().unwrap(), "GET /products/search?q=phone HTTP/1.1");
    }
}
