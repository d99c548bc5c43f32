//! `catalog search`: query every stored catalog through the searcher.
//!
//! All catalogs are read from SQLite, pushed into an isolated
//! [`SearcherHandle`], and queried there. Hits are printed with their
//! record details, or as the raw [`CatalogQueryResult`] with `--json`.
//!
//! In interactive mode each stdin line becomes the free-text part of the
//! query. Lines pass through a [`QueryDebouncer`] so only the last edit
//! in a burst reaches the searcher, and replies to superseded requests are
//! dropped by request id.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use catalog_core::models::{CatalogQuery, CatalogQueryResult, Catalogs};
use catalog_core::search::compile_query;
use catalog_core::store::CatalogStore;

use crate::config::Config;
use crate::debounce::QueryDebouncer;
use crate::searcher::{SearcherEvent, SearcherHandle};
use crate::sqlite_store::SqliteCatalogStore;

/// Output switches for `catalog search`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOutput {
    pub json: bool,
    pub explain: bool,
}

async fn load_catalogs(config: &Config) -> Result<Catalogs> {
    let store = SqliteCatalogStore::open(config).await?;
    let catalogs = store.fetch_all_catalogs().await;
    store.close().await;
    catalogs
}

/// Fill the query's classification names from the records carrying its
/// `--class`/`--subclass` ids, so keyword suggestions include them even
/// when every matching record is filtered out.
pub fn fill_classification_names(query: &mut CatalogQuery, catalogs: &Catalogs) {
    for record in catalogs.values().flat_map(|catalog| catalog.values()) {
        if query.classification_ids.contains(&record.classification_id) {
            push_name(&mut query.classification_names, &record.classification_name);
        }
        if query.sub_classification_ids.contains(&record.sub_classification_id) {
            push_name(&mut query.sub_classification_names, &record.sub_classification_name);
        }
    }
}

fn push_name(names: &mut Vec<String>, name: &str) {
    let name = name.trim();
    if !name.is_empty() && !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

async fn start_searcher(config: &Config, catalogs: &Catalogs) -> Result<SearcherHandle> {
    let mut searcher = SearcherHandle::spawn(config.search.index_options());
    searcher.load(catalogs.clone())?;
    searcher.wait_loaded().await?;
    Ok(searcher)
}

pub async fn run_search(config: &Config, mut query: CatalogQuery, output: SearchOutput) -> Result<()> {
    let catalogs = load_catalogs(config).await?;
    fill_classification_names(&mut query, &catalogs);
    let mut searcher = start_searcher(config, &catalogs).await?;

    if output.explain {
        eprintln!("{}", serde_json::to_string_pretty(&compile_query(&query).to_json())?);
    }

    let result = searcher.search_and_wait(Some(query)).await?;
    searcher.shutdown().await;

    print_result(&result, &catalogs, output.json)
}

/// Read free-text edits from stdin until EOF, searching after each pause.
pub async fn run_interactive(config: &Config, mut base: CatalogQuery, output: SearchOutput) -> Result<()> {
    let catalogs = load_catalogs(config).await?;
    fill_classification_names(&mut base, &catalogs);
    let mut searcher = start_searcher(config, &catalogs).await?;
    let (debouncer, mut flushed) = QueryDebouncer::spawn(config.search.debounce());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut flush_open = true;
    let mut latest: Option<u64> = None;
    let mut debouncer = Some(debouncer);

    eprintln!("Type a query; results follow each pause. Ctrl-D to quit.");

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(text) => {
                    if let Some(d) = &debouncer {
                        d.submit(CatalogQuery {
                            search_text: text.trim().to_string(),
                            ..base.clone()
                        })?;
                    }
                }
                None => {
                    stdin_open = false;
                    if let Some(d) = debouncer.take() {
                        d.close().await;
                    }
                }
            },
            query = flushed.recv(), if flush_open => match query {
                Some(query) => {
                    if output.explain {
                        eprintln!("{}", compile_query(&query).to_json());
                    }
                    latest = Some(searcher.search(Some(query))?);
                }
                None => flush_open = false,
            },
            event = searcher.next_event(), if latest.is_some() => match event {
                Some(SearcherEvent::Searched { request_id, result }) => {
                    if Some(request_id) == latest {
                        latest = None;
                        print_result(&result, &catalogs, output.json)?;
                    } else {
                        tracing::debug!(request_id, "dropping superseded search reply");
                    }
                }
                Some(SearcherEvent::Loaded) => {}
                Some(SearcherEvent::Failed { error, .. }) => anyhow::bail!(error),
                None => anyhow::bail!("searcher stopped"),
            },
        }

        if !stdin_open && !flush_open && latest.is_none() {
            break;
        }
    }

    searcher.shutdown().await;
    Ok(())
}

fn print_result(result: &CatalogQueryResult, catalogs: &Catalogs, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.item_keys.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in result.item_keys.iter().enumerate() {
        let record = catalogs
            .get(&hit.office_id)
            .and_then(|catalog| catalog.get(&hit.record_id));

        match record {
            Some(r) => {
                println!("{}. {} / {}", i + 1, hit.office_id, r.item_description);
                println!(
                    "    class: {} / {}",
                    r.classification_name, r.sub_classification_name
                );
                if !r.unit_price.is_nan() {
                    println!("    unit price: {:.2}", r.unit_price);
                }
                if let Some(link) = &r.item_linked_to {
                    println!("    linked to: {}", link);
                }
            }
            None => println!("{}. {} / (missing record)", i + 1, hit.office_id),
        }
        println!("    item: {}  record: {}", hit.item_id, hit.record_id);
        println!();
    }

    println!(
        "{} shown, {} matched across {} catalog{}",
        result.item_keys.len(),
        result.matched_records,
        result.matched_catalogs,
        if result.matched_catalogs == 1 { "" } else { "s" }
    );
    if !result.key_words.is_empty() {
        println!("keywords: {}", result.key_words.join(", "));
    }
    Ok(())
}
