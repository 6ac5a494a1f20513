//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits
//! (remote pages and BitTorrent swarms), so the whole pipeline can be tested
//! without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use espada_core::testing::{fixtures, MockPageFetcher, MockSwarmClient};
//!
//! let fetcher = MockPageFetcher::new();
//! let swarm = MockSwarmClient::new();
//!
//! fetcher.set_page(url, fixtures::detail_page(&[&fixtures::magnet(hash)])).await;
//! swarm.add_swarm(hash, vec![("movie.mkv", bytes)]).await;
//! ```

mod mock_page_fetcher;
mod mock_swarm_client;

pub use mock_page_fetcher::MockPageFetcher;
pub use mock_swarm_client::{MockSwarmClient, RecordedJoin, RecordedOpen};

/// Test fixtures and helper functions.
pub mod fixtures {
    /// A bare magnet URI for `info_hash`.
    pub fn magnet(info_hash: &str) -> String {
        format!("magnet:?xt=urn:btih:{}", info_hash)
    }

    /// A detail page with one download button per magnet, in order.
    pub fn detail_page(magnets: &[&str]) -> String {
        let buttons: String = magnets
            .iter()
            .map(|m| {
                format!(
                    r#"<a class="btn-descarga" href="{}">Descargar</a>"#,
                    m.replace('&', "&amp;")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            r#"<html><body><div class="sinopsis">Una pelicula.</div>
<div class="enlaces">{}</div></body></html>"#,
            buttons
        )
    }

    /// A listing page with one item per `(title, detail_url)`.
    pub fn listing_page(items: &[(&str, &str)]) -> String {
        let items: String = items
            .iter()
            .enumerate()
            .map(|(i, (title, url))| {
                format!(
                    r#"<article class="item_1 items">
  <a href="{url}"><img src="https://img.hackstore.to/poster-{i}.jpg" alt=""></a>
  <h2>{title}</h2>
</article>"#,
                    url = url,
                    i = i,
                    title = title
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            r#"<html><body><div class="peliculas">{}</div></body></html>"#,
            items
        )
    }
}
