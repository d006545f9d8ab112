use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::RunOptions;
use crate::fetch::PageSource;
use crate::output::{JsonArrayWriter, NdjsonWriter};
use crate::parser::Parsers;
use crate::project::project;
use crate::row::{layout, RowBuffer};

/// Totals reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub written: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Result of one fetch + parse.
enum Outcome {
    Parsed(RowBuffer),
    /// Parser declined the page (layout mismatch or excluded icon).
    Declined,
    Failed(anyhow::Error),
}

/// Drops a stallion whose (name, ability) repeats the previous emitted stallion.
/// Broodmares neither trigger nor reset it.
#[derive(Default)]
struct StallionDedup {
    last_name: String,
    last_ability: String,
}

impl StallionDedup {
    fn is_repeat(&mut self, row: &RowBuffer) -> bool {
        if !row.is_male() {
            return false;
        }
        let name = row.get(layout::HORSE_NAME);
        let ability = row.get(layout::ABILITY);
        if name == self.last_name && ability == self.last_ability {
            return true;
        }
        self.last_name = name.to_string();
        self.last_ability = ability.to_string();
        false
    }
}

/// Fetch, parse and write every URL, keeping source order in the output.
///
/// URLs run in batches of `2 * workers`; within a batch at most `workers`
/// fetches are in flight. A batch is fully joined before any of its results
/// are written, and results are written in source order.
pub async fn run<W: Write, D: Write>(
    source: Arc<dyn PageSource>,
    urls: &[String],
    opts: &RunOptions,
    out: &mut JsonArrayWriter<W>,
    mut debug_out: Option<&mut NdjsonWriter<D>>,
) -> Result<RunStats> {
    let parsers = Arc::new(Parsers::new(opts.skip_icons.clone()));
    let semaphore = Arc::new(Semaphore::new(opts.workers()));
    let batch_size = opts.batch_size();
    let delay = opts.delay;

    let pb = ProgressBar::new(urls.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut stats = RunStats::default();
    let mut dedup = StallionDedup::default();

    for (batch_no, batch) in urls.chunks(batch_size).enumerate() {
        let batch_start = batch_no * batch_size;
        let mut tasks = JoinSet::new();

        for (i, url) in batch.iter().enumerate() {
            let idx = batch_start + i + 1;
            let source = Arc::clone(&source);
            let parsers = Arc::clone(&parsers);
            let sem = Arc::clone(&semaphore);
            let url = url.clone();

            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = sem.acquire().await.ok();
                let outcome = fetch_and_parse(source.as_ref(), &parsers, idx, &url, delay).await;
                (idx, outcome)
            });
        }

        // Barrier: every task of the batch finishes before anything is written.
        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => {
                    results.insert(idx, outcome);
                }
                Err(e) => warn!("Worker task failed: {}", e),
            }
        }
        debug!("Batch {} joined ({} results)", batch_no + 1, results.len());

        for (i, url) in batch.iter().enumerate() {
            let idx = batch_start + i + 1;
            let outcome = results
                .remove(&idx)
                .unwrap_or_else(|| Outcome::Failed(anyhow!("worker task did not complete")));
            pb.inc(1);

            let row = match outcome {
                Outcome::Parsed(row) => row,
                Outcome::Declined => {
                    stats.skipped += 1;
                    continue;
                }
                Outcome::Failed(e) => {
                    stats.errors += 1;
                    pb.suspend(|| warn!("[error] {}: {:#}", url, e));
                    continue;
                }
            };

            if dedup.is_repeat(&row) {
                debug!("Skipping consecutive duplicate stallion {}", url);
                stats.skipped += 1;
                continue;
            }

            out.push(&project(&row))?;
            if let Some(d) = debug_out.as_deref_mut() {
                d.push(&row.sparse())?;
            }

            stats.written += 1;
            if opts.progress > 0 && stats.written % opts.progress == 0 {
                pb.suspend(|| info!("processed: {} (source index {})", stats.written, idx));
            }
        }
    }

    pb.finish_and_clear();
    Ok(stats)
}

async fn fetch_and_parse(
    source: &dyn PageSource,
    parsers: &Parsers,
    idx: usize,
    url: &str,
    delay: Duration,
) -> Outcome {
    let html = match source.fetch_page(url).await {
        Ok(html) => html,
        Err(e) => return Outcome::Failed(e.into()),
    };
    let outcome = match parsers.parse_page(url, idx, &html) {
        Some(row) => Outcome::Parsed(row),
        None => Outcome::Declined,
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::fetch::tests::FakeSource;
    use crate::project::HorseEntry;

    fn stallion_page(name: &str, ability: &str) -> String {
        format!(
            r#"<html><body><div id="content"><div>
            <div><h4>非凡</h4><a href="/a"><p>{ability}</p></a></div>
            <table>
              <tr><td></td><td><img src="/s.png"></td></tr>
              <tr><td><img src="/icon.png"></td><td><span>{name}</span></td></tr>
              <tr><td><div>リボー系</div></td></tr>
            </table>
            </div></div></body></html>"#
        )
    }

    fn broodmare_page(name: &str) -> String {
        format!(
            r#"<html><body><div id="content"><div><div>
            <div>テディ系</div>
            <table><tr><td></td><td><span>{name}</span></td></tr></table>
            </div></div></div></body></html>"#
        )
    }

    fn stallion_url(n: usize) -> String {
        format!("https://dabimas.jp/kouryaku/stallions/{}.html", n)
    }

    fn broodmare_url(n: usize) -> String {
        format!("https://dabimas.jp/kouryaku/broodmares/{}.html", n)
    }

    fn opts(workers: usize) -> RunOptions {
        RunOptions {
            workers,
            delay: Duration::ZERO,
            progress: 0,
            ..Default::default()
        }
    }

    struct Output {
        stats: RunStats,
        entries: Vec<HorseEntry>,
        debug_lines: Vec<serde_json::Value>,
    }

    async fn run_with(source: FakeSource, urls: &[String], opts: &RunOptions) -> Output {
        let mut out = JsonArrayWriter::start(Vec::new()).unwrap();
        let mut dbg = NdjsonWriter::new(Vec::new());
        let stats = run(Arc::new(source), urls, opts, &mut out, Some(&mut dbg)).await.unwrap();

        let main = String::from_utf8(out.finish().unwrap()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&main).unwrap();
        let entries: Vec<HorseEntry> = serde_json::from_value(doc["horseLists"].clone()).unwrap();
        let debug_lines: Vec<serde_json::Value> = String::from_utf8(dbg.finish().unwrap())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        Output { stats, entries, debug_lines }
    }

    /// Digit-free so the name suffix split leaves it alone.
    fn horse_name(i: usize) -> String {
        format!("ホース{}", char::from(b'A' + i as u8))
    }

    fn names(entries: &[HorseEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn consecutive_duplicate_stallion_dropped() {
        let urls: Vec<String> = (1..=3).map(stallion_url).collect();
        let source = FakeSource::new()
            .page(&urls[0], &stallion_page("アルファ", "X"))
            .page(&urls[1], &stallion_page("アルファ", "X"))
            .page(&urls[2], &stallion_page("ベータ", "X"));
        let o = run_with(source, &urls, &opts(2)).await;
        assert_eq!(o.stats, RunStats { written: 2, skipped: 1, errors: 0 });
        assert_eq!(names(&o.entries), vec!["アルファ", "ベータ"]);
        assert_eq!(o.debug_lines.len(), 2);
    }

    #[tokio::test]
    async fn different_ability_is_not_duplicate() {
        let urls: Vec<String> = (1..=2).map(stallion_url).collect();
        let source = FakeSource::new()
            .page(&urls[0], &stallion_page("アルファ", "X"))
            .page(&urls[1], &stallion_page("アルファ", "Y"));
        let o = run_with(source, &urls, &opts(2)).await;
        assert_eq!(o.stats.written, 2);
    }

    #[tokio::test]
    async fn broodmare_does_not_reset_dedup() {
        let urls = vec![stallion_url(1), broodmare_url(2), stallion_url(3), broodmare_url(4)];
        let source = FakeSource::new()
            .page(&urls[0], &stallion_page("アルファ", "X"))
            .page(&urls[1], &broodmare_page("マザー"))
            .page(&urls[2], &stallion_page("アルファ", "X"))
            .page(&urls[3], &broodmare_page("マザー"));
        let o = run_with(source, &urls, &opts(4)).await;
        assert_eq!(o.stats, RunStats { written: 3, skipped: 1, errors: 0 });
        assert_eq!(names(&o.entries), vec!["アルファ", "マザー", "マザー"]);
    }

    #[tokio::test]
    async fn dedup_spans_batch_boundary() {
        // workers=1 → batch of 2; the repeat sits in the second batch
        let urls: Vec<String> = (1..=3).map(stallion_url).collect();
        let source = FakeSource::new()
            .page(&urls[0], &stallion_page("ガンマ", "Z"))
            .page(&urls[1], &stallion_page("デルタ", "Z"))
            .page(&urls[2], &stallion_page("デルタ", "Z"));
        let o = run_with(source, &urls, &opts(1)).await;
        assert_eq!(o.stats, RunStats { written: 2, skipped: 1, errors: 0 });
    }

    #[tokio::test]
    async fn order_survives_latency_jitter() {
        let n = 13;
        let urls: Vec<String> = (1..=n).map(stallion_url).collect();
        let mut source = FakeSource::new();
        for (i, url) in urls.iter().enumerate() {
            // earlier URLs answer later
            let delay = Duration::from_millis(((n - i) * 7 % 40) as u64);
            source = source.slow_page(url, &stallion_page(&horse_name(i), "A"), delay);
        }
        let o = run_with(source, &urls, &opts(3)).await;
        let expected: Vec<String> = (0..n).map(horse_name).collect();
        assert_eq!(names(&o.entries), expected);

        let serials: Vec<&str> = o.debug_lines.iter().map(|v| v["2"].as_str().unwrap()).collect();
        let expected_serials: Vec<String> = (1..=n).map(|i| format!("{:05}", i)).collect();
        assert_eq!(serials, expected_serials);
    }

    #[tokio::test]
    async fn workers_bound_fetches_and_batches_do_not_overlap() {
        let workers = 2;
        let n = 10;
        let urls: Vec<String> = (1..=n).map(stallion_url).collect();
        let mut source = FakeSource::new();
        for (i, url) in urls.iter().enumerate() {
            let delay = Duration::from_millis((5 + i * 11 % 23) as u64);
            source = source.slow_page(url, &stallion_page(&horse_name(i), "A"), delay);
        }
        let source = Arc::new(source);
        let o = opts(workers);
        let mut out = JsonArrayWriter::start(Vec::new()).unwrap();
        let stats = run(source.clone(), &urls, &o, &mut out, None::<&mut NdjsonWriter<Vec<u8>>>)
            .await
            .unwrap();
        assert_eq!(stats.written, n);

        assert_eq!(source.peak_in_flight.load(std::sync::atomic::Ordering::SeqCst), workers);

        let spans = source.spans.lock().unwrap();
        assert_eq!(spans.len(), n);
        let batch_of = |url: &str| urls.iter().position(|u| u == url).unwrap() / o.batch_size();
        let batches = n.div_ceil(o.batch_size());
        for k in 1..batches {
            let prev_end = spans
                .iter()
                .filter(|(url, _, _)| batch_of(url) == k - 1)
                .map(|(_, _, end)| *end)
                .max()
                .unwrap();
            let next_start = spans
                .iter()
                .filter(|(url, _, _)| batch_of(url) == k)
                .map(|(_, start, _)| *start)
                .min()
                .unwrap();
            assert!(next_start >= prev_end, "batch {} started before batch {} joined", k, k - 1);
        }
    }

    #[tokio::test]
    async fn missing_container_is_skipped_not_error() {
        let url = stallion_url(1);
        let html = std::fs::read_to_string("tests/fixtures/no_content.html").unwrap();
        let source = FakeSource::new().page(&url, &html);
        let o = run_with(source, &[url], &opts(2)).await;
        assert_eq!(o.stats, RunStats { written: 0, skipped: 1, errors: 0 });
        assert!(o.entries.is_empty());
        assert!(o.debug_lines.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_counted_and_run_continues() {
        let urls = vec![stallion_url(1), stallion_url(2), broodmare_url(3)];
        let source = FakeSource::new()
            .failing(&urls[0], 503)
            .page(&urls[1], &stallion_page("イプシロン", "B"))
            .page(&urls[2], &broodmare_page("ゼータ"));
        let o = run_with(source, &urls, &opts(2)).await;
        assert_eq!(o.stats, RunStats { written: 2, skipped: 0, errors: 1 });
        assert_eq!(names(&o.entries), vec!["イプシロン", "ゼータ"]);
    }

    #[tokio::test]
    async fn excluded_icon_skipped() {
        let url = stallion_url(1);
        let source = FakeSource::new().page(&url, &stallion_page("オメガ", "Q"));
        let mut o = opts(1);
        o.skip_icons = HashSet::from(["https://dabimas.jp/icon.png".to_string()]);
        let out = run_with(source, &[url], &o).await;
        assert_eq!(out.stats, RunStats { written: 0, skipped: 1, errors: 0 });
    }

    #[tokio::test]
    async fn fixtures_end_to_end() {
        let urls = vec![stallion_url(1234), broodmare_url(555)];
        let source = FakeSource::new()
            .page(&urls[0], &std::fs::read_to_string("tests/fixtures/stallion.html").unwrap())
            .page(&urls[1], &std::fs::read_to_string("tests/fixtures/broodmare.html").unwrap());
        let o = run_with(source, &urls, &opts(8)).await;
        assert_eq!(o.stats.written, 2);

        let deep = &o.entries[0];
        assert_eq!(deep.name, "ディープインパクト");
        assert_eq!(deep.sub_name, "2005");
        assert_eq!(deep.sex, "0");
        assert_eq!(deep.parent_line, "Ro");
        assert_eq!(deep.nature, "大舞台");
        assert_eq!(deep.factors, ["", "速", "走"]);
        assert_eq!(deep.descendants[0].name, "サンデーサイレンス");
        // slots 68..=70: factor 01, empty cell, factor 02
        assert_eq!(deep.descendants[0].factors, ["短", "", "速"]);
        assert_eq!(deep.descendants[1].factors, ["", "", "丈"]);
        assert_eq!(deep.descendants[2].factors, ["", "", ""]);

        let mare = &o.entries[1];
        assert_eq!(mare.sex, "1");
        assert_eq!(mare.parent_line, "Ne");
        assert_eq!(mare.son, "ニアークティック系");

        assert_eq!(o.debug_lines[0]["3"], urls[0].as_str());
        assert_eq!(o.debug_lines[1]["1"], "1");
        assert!(o.debug_lines[0].get("12").is_none());
    }

    #[tokio::test]
    async fn empty_url_list() {
        let o = run_with(FakeSource::new(), &[], &opts(4)).await;
        assert_eq!(o.stats, RunStats::default());
        assert!(o.entries.is_empty());
    }
}
