//! JSON-over-HTTP page source.
//!
//! Pages map onto `GET <url>?limit=<page_size>&offset=<(page-1)*page_size>`
//! and the response body is a JSON array of rows.

use std::marker::PhantomData;

use anyhow::Context;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;

use super::source::PageSource;
use crate::core::position::Page;

pub struct HttpSource<T> {
    client: reqwest::Client,
    url: String,
    _rows: PhantomData<fn() -> T>,
}

impl<T> HttpSource<T> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            _rows: PhantomData,
        }
    }
}

/// Query parameters for one page.
pub fn page_query(page: Page, page_size: usize) -> [(&'static str, usize); 2] {
    [
        ("limit", page_size),
        ("offset", page.saturating_sub(1) * page_size),
    ]
}

impl<T> PageSource for HttpSource<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Item = T;

    fn request_page(
        &self,
        page: Page,
        page_size: usize,
    ) -> BoxFuture<'static, anyhow::Result<Vec<T>>> {
        let request = self.client.get(&self.url).query(&page_query(page, page_size));
        async move {
            let response = request
                .send()
                .await
                .with_context(|| format!("requesting page {page}"))?
                .error_for_status()?;
            let rows: Vec<T> = response
                .json()
                .await
                .with_context(|| format!("decoding page {page}"))?;
            Ok(rows)
        }
        .boxed()
    }
}
