//! Parser for archived-HTML (`.mhtml`/`.mht`) sales report exports.
//!
//! The export tool wraps the actual report markup in a MIME archive with a
//! single base64-encoded HTML part. Locating and decoding that payload is
//! the only fatal step; every field extracted from the decoded markup is
//! optional and defaults to zero/empty when its pattern does not match.
//!
//! Row extraction runs an ordered chain of strategies and takes the first
//! one that yields any rows:
//!
//! 1. `strict` -- anchored on the export tool's internal style classes
//!    (`a221a` name link followed by `a228`/`a232`/`a236`/`a241` numeric
//!    cells). Brittle by construction; the classes are an artifact of the
//!    exporting tool and can change between its versions.
//! 2. `name-scan` -- best-effort recovery: find "Lastname, Firstname" text
//!    nodes and positionally assign the numeric tokens that follow each
//!    name. No correctness guarantee beyond "better than nothing".

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// File extensions accepted for report uploads (suffix check only).
pub const REPORT_EXTENSIONS: &[&str] = &["mhtml", "mht"];

/// Size in bytes of the document window scanned for numbers after each
/// name during best-effort recovery.
const RECOVERY_WINDOW_BYTES: usize = 500;

/// Minimum numeric tokens required to accept a recovered row.
const RECOVERY_MIN_NUMBERS: usize = 3;

// ---------------------------------------------------------------------------
// Compiled patterns
// ---------------------------------------------------------------------------

/// The base64 part announced by its transfer-encoding header, captured up
/// to the next MIME boundary or end of input.
static PAYLOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Content-Transfer-Encoding: base64\s+([\s\S]+?)(?:------=|$)").expect("valid regex")
});

static DATE_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Date Range:\s*([^<\n]+)").expect("valid regex"));

static SUPERVISOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Supervisor:\s*([^<\n]+)").expect("valid regex"));

static TOTAL_SALES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total Sales:\s*\$?([\d,]+\.?\d*)").expect("valid regex"));

static TOTAL_ORDERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total Orders:\s*(\d+)").expect("valid regex"));

static AVG_ORDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Avg Order Size:\s*\$?([\d,]+\.?\d*)").expect("valid regex"));

static SALES_PER_REP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sales per Rep:\s*\$?([\d,]+\.?\d*)").expect("valid regex"));

static NEW_SALES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"New Sales:\s*\$?([\d,]+\.?\d*)").expect("valid regex"));

static NEW_ORDERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"New Orders:\s*(\d+)").expect("valid regex"));

/// One row per person: a labeled name link followed in document order by
/// four labeled numeric cells. The `</DIV>` casing matches the export tool.
static STRICT_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<a[^>]*class="a221a"[^>]*>([^<]+)</a>[\s\S]*?class="a228"[^>]*>(\d+)</DIV>[\s\S]*?class="a232"[^>]*>\$?([\d,]+\.?\d*)</DIV>[\s\S]*?class="a236"[^>]*>\$?([\d,]+\.?\d*)</DIV>[\s\S]*?class="a241"[^>]*>\$?([\d,]+\.?\d*)</DIV>"#,
    )
    .expect("valid regex")
});

/// A "Lastname, Firstname" text node for recovery scanning.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">([A-Za-z]+,\s*[A-Za-z]+)<").expect("valid regex"));

/// Any currency-ish numeric token.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?([\d,]+\.?\d*)").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-person metrics recovered from one uploaded report.
///
/// Created fresh on each parse and never mutated; the caller discards the
/// previous batch when a new file is uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// "Last, First" or free text, as it appears in the report.
    pub name: String,
    pub orders: i64,
    pub avg_order_size: f64,
    pub total: f64,
    pub new_revenue: f64,
}

/// Report-level summary figures. Each field is independently optional in
/// the source document and defaults to zero when its label is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_sales: f64,
    pub total_orders: i64,
    pub avg_order_size: f64,
    pub sales_per_rep: f64,
    pub new_sales: f64,
    pub new_orders: i64,
}

/// The full result of parsing one report document.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedReport {
    pub records: Vec<SalesRecord>,
    pub summary: ReportSummary,
    /// Free-text date-range label, empty when absent.
    pub date_range: String,
    /// Free-text supervisor label, empty when absent.
    pub supervisor: String,
    /// Name of the row-extraction strategy that produced `records`, or
    /// `None` when every strategy came up empty.
    pub strategy: Option<&'static str>,
}

/// Fatal parse failures. Everything below the payload decode is best-effort
/// and defaults instead of erroring.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No base64 transfer-encoding marker was found in the archive.
    #[error("No base64 payload found in the report archive")]
    MissingPayload,

    /// The payload could not be decoded from base64.
    #[error("Failed to decode the report payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Check an upload filename against the accepted report extensions.
///
/// Suffix check only; no content sniffing.
pub fn has_report_extension(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    REPORT_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Parse the raw text of an archived-HTML report into records plus summary.
pub fn parse_report(content: &str) -> Result<ParsedReport, ParseError> {
    let html = decode_payload(content)?;

    let summary = extract_summary(&html);
    let date_range = extract_label(&html, &DATE_RANGE_RE);
    let supervisor = extract_label(&html, &SUPERVISOR_RE);

    let mut records = Vec::new();
    let mut strategy = None;
    for (name, extract) in ROW_STRATEGIES {
        if let Some(rows) = extract(&html) {
            records = rows;
            strategy = Some(*name);
            break;
        }
    }

    Ok(ParsedReport {
        records,
        summary,
        date_range,
        supervisor,
        strategy,
    })
}

/// Locate the base64 part and decode it into the underlying markup.
fn decode_payload(content: &str) -> Result<String, ParseError> {
    let captures = PAYLOAD_RE.captures(content).ok_or(ParseError::MissingPayload)?;

    // The payload is line-wrapped by the archiver; strip all whitespace
    // before decoding.
    let cleaned: String = captures[1].split_whitespace().collect();
    let bytes = BASE64.decode(cleaned.as_bytes())?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Summary and label extraction
// ---------------------------------------------------------------------------

fn extract_summary(html: &str) -> ReportSummary {
    ReportSummary {
        total_sales: match_currency(html, &TOTAL_SALES_RE),
        total_orders: match_count(html, &TOTAL_ORDERS_RE),
        avg_order_size: match_currency(html, &AVG_ORDER_RE),
        sales_per_rep: match_currency(html, &SALES_PER_REP_RE),
        new_sales: match_currency(html, &NEW_SALES_RE),
        new_orders: match_count(html, &NEW_ORDERS_RE),
    }
}

fn extract_label(html: &str, re: &Regex) -> String {
    re.captures(html)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default()
}

fn match_currency(html: &str, re: &Regex) -> f64 {
    re.captures(html)
        .map(|c| parse_currency(&c[1]))
        .unwrap_or(0.0)
}

fn match_count(html: &str, re: &Regex) -> i64 {
    re.captures(html)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// Parse a currency-formatted number, stripping thousands separators and a
/// leading currency symbol. Unparseable input yields the zero default.
fn parse_currency(raw: &str) -> f64 {
    raw.replace(['$', ','], "").parse().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Row extraction strategies
// ---------------------------------------------------------------------------

type RowStrategy = fn(&str) -> Option<Vec<SalesRecord>>;

/// Ordered extraction chain: first strategy returning rows wins.
const ROW_STRATEGIES: &[(&str, RowStrategy)] = &[
    ("strict", extract_rows_strict),
    ("name-scan", extract_rows_recovery),
];

/// Strict structural pattern keyed on the export tool's style classes.
fn extract_rows_strict(html: &str) -> Option<Vec<SalesRecord>> {
    let records: Vec<SalesRecord> = STRICT_ROW_RE
        .captures_iter(html)
        .map(|cap| SalesRecord {
            name: cap[1].trim().to_string(),
            orders: cap[2].parse().unwrap_or(0),
            avg_order_size: parse_currency(&cap[3]),
            total: parse_currency(&cap[4]),
            new_revenue: parse_currency(&cap[5]),
        })
        .collect();

    if records.is_empty() {
        None
    } else {
        Some(records)
    }
}

/// Best-effort recovery: for each distinct "Lastname, Firstname" text node,
/// collect the positive numeric tokens in a fixed window after its first
/// occurrence and assign them positionally.
fn extract_rows_recovery(html: &str) -> Option<Vec<SalesRecord>> {
    let mut names: Vec<&str> = Vec::new();
    for cap in NAME_RE.captures_iter(html) {
        let name = cap.get(1).expect("group 1 exists").as_str().trim();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let mut records = Vec::new();
    for name in names {
        let Some(idx) = html.find(name) else {
            continue;
        };
        let window = truncate_at_char_boundary(&html[idx..], RECOVERY_WINDOW_BYTES);

        let numbers: Vec<f64> = NUMBER_RE
            .captures_iter(window)
            .filter_map(|c| c[1].replace(',', "").parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n > 0.0)
            .collect();

        if numbers.len() < RECOVERY_MIN_NUMBERS {
            continue;
        }

        // First token is the order count; a fractional or sub-one token
        // still counts as one order.
        let mut orders = numbers[0].round() as i64;
        if orders == 0 {
            orders = 1;
        }

        records.push(SalesRecord {
            name: name.to_string(),
            orders,
            avg_order_size: numbers[1],
            total: numbers[2],
            // Without a fourth token, treat the whole total as new revenue.
            new_revenue: numbers.get(3).copied().unwrap_or(numbers[2]),
        });
    }

    if records.is_empty() {
        None
    } else {
        Some(records)
    }
}

/// Slice at most `max` bytes without splitting a UTF-8 character.
fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Wrap report markup in a minimal MIME archive with a base64 part.
    fn archive(html: &str) -> String {
        let payload = BASE64.encode(html);
        // Line-wrap the payload the way archivers do.
        let wrapped: String = payload
            .as_bytes()
            .chunks(76)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        format!(
            "MIME-Version: 1.0\r\nContent-Type: text/html\r\nContent-Transfer-Encoding: base64\r\n\r\n{wrapped}\r\n------=_NextPart_000_0000\r\n"
        )
    }

    fn strict_row(name: &str, orders: i64, avg: &str, total: &str, new: &str) -> String {
        format!(
            r#"<a class="a221a" href="sales-by-agent">{name}</a><DIV class="a228">{orders}</DIV><DIV class="a232">{avg}</DIV><DIV class="a236">{total}</DIV><DIV class="a241">{new}</DIV>"#
        )
    }

    // -- fatal failures -------------------------------------------------------

    #[test]
    fn missing_payload_marker_is_fatal() {
        let result = parse_report("<html>no mime parts here</html>");
        assert!(matches!(result, Err(ParseError::MissingPayload)));
    }

    #[test]
    fn invalid_base64_is_fatal() {
        let content = "Content-Transfer-Encoding: base64\r\n\r\n!!!not-base64!!!\r\n------=_X\r\n";
        let result = parse_report(content);
        assert!(matches!(result, Err(ParseError::InvalidEncoding(_))));
    }

    // -- strict strategy ------------------------------------------------------

    #[test]
    fn strict_rows_extracted() {
        let html = format!(
            "<html><body>Date Range: Jan 1 - Jan 31, 2026\nSupervisor: Smith Alice\n\
             Total Sales: $12,345.67\nTotal Orders: 321\nAvg Order Size: $38.46\n\
             Sales per Rep: $6,172.84\nNew Sales: $2,000.00\nNew Orders: 45\n{}{}</body></html>",
            strict_row("Doe, John", 12, "$40.50", "$486.00", "$120.00"),
            strict_row("Roe, Jane", 7, "$31.00", "$217.00", "$50.00"),
        );
        let parsed = parse_report(&archive(&html)).unwrap();

        assert_eq!(parsed.strategy, Some("strict"));
        assert_eq!(parsed.records.len(), 2);

        let doe = &parsed.records[0];
        assert_eq!(doe.name, "Doe, John");
        assert_eq!(doe.orders, 12);
        assert_eq!(doe.avg_order_size, 40.5);
        assert_eq!(doe.total, 486.0);
        assert_eq!(doe.new_revenue, 120.0);

        assert_eq!(parsed.summary.total_sales, 12345.67);
        assert_eq!(parsed.summary.total_orders, 321);
        assert_eq!(parsed.summary.avg_order_size, 38.46);
        assert_eq!(parsed.summary.sales_per_rep, 6172.84);
        assert_eq!(parsed.summary.new_sales, 2000.0);
        assert_eq!(parsed.summary.new_orders, 45);
        assert_eq!(parsed.date_range, "Jan 1 - Jan 31, 2026");
        assert_eq!(parsed.supervisor, "Smith Alice");
    }

    #[test]
    fn summary_fields_default_to_zero_when_absent() {
        let html = strict_row("Doe, John", 1, "$1.00", "$1.00", "$1.00");
        let parsed = parse_report(&archive(&html)).unwrap();

        assert_eq!(parsed.summary, ReportSummary::default());
        assert_eq!(parsed.date_range, "");
        assert_eq!(parsed.supervisor, "");
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn currency_thousands_separators_stripped() {
        let html = format!(
            "Total Sales: $1,234,567.89\n{}",
            strict_row("Doe, John", 3, "$1,000.00", "$3,000.00", "$1,500.50")
        );
        let parsed = parse_report(&archive(&html)).unwrap();

        assert_eq!(parsed.summary.total_sales, 1_234_567.89);
        assert_eq!(parsed.records[0].avg_order_size, 1000.0);
        assert_eq!(parsed.records[0].total, 3000.0);
        assert_eq!(parsed.records[0].new_revenue, 1500.5);
    }

    // -- recovery strategy ----------------------------------------------------

    #[test]
    fn recovery_used_when_strict_pattern_misses() {
        let html = "<table><td>Doe, John</td><td>12</td><td>$40.50</td>\
                    <td>$486.00</td><td>$120.00</td></table>";
        let parsed = parse_report(&archive(html)).unwrap();

        assert_eq!(parsed.strategy, Some("name-scan"));
        assert_eq!(parsed.records.len(), 1);
        let rec = &parsed.records[0];
        assert_eq!(rec.name, "Doe, John");
        assert_eq!(rec.orders, 12);
        assert_eq!(rec.avg_order_size, 40.5);
        assert_eq!(rec.total, 486.0);
        assert_eq!(rec.new_revenue, 120.0);
    }

    #[test]
    fn recovery_new_revenue_falls_back_to_total() {
        let html = "<td>Roe, Jane</td><td>5</td><td>$20.00</td><td>$100.00</td>";
        let parsed = parse_report(&archive(html)).unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].new_revenue, 100.0);
    }

    #[test]
    fn recovery_fractional_order_count_defaults_to_one() {
        let html = "<td>Roe, Jane</td><td>0.4</td><td>$10.00</td><td>$20.00</td>";
        let parsed = parse_report(&archive(html)).unwrap();

        assert_eq!(parsed.records[0].orders, 1);
    }

    #[test]
    fn recovery_dedupes_repeated_names() {
        let html = "<td>Doe, John</td><td>3</td><td>$5.00</td><td>$15.00</td>\
                    <td>Doe, John</td><td>9</td><td>$9.00</td><td>$81.00</td>";
        let parsed = parse_report(&archive(html)).unwrap();

        assert_eq!(parsed.records.len(), 1);
        // The window anchors at the first occurrence.
        assert_eq!(parsed.records[0].orders, 3);
    }

    #[test]
    fn recovery_needs_at_least_three_numbers() {
        let html = "<td>Doe, John</td><td>3</td><td>$5.00</td>";
        let parsed = parse_report(&archive(html)).unwrap();

        assert!(parsed.records.is_empty());
        assert_eq!(parsed.strategy, None);
    }

    // -- extension check ------------------------------------------------------

    #[test]
    fn report_extensions_accepted() {
        assert!(has_report_extension("export.mhtml"));
        assert!(has_report_extension("export.mht"));
        assert!(has_report_extension("EXPORT.MHTML"));
    }

    #[test]
    fn other_extensions_rejected() {
        assert!(!has_report_extension("export.html"));
        assert!(!has_report_extension("export.pdf"));
        assert!(!has_report_extension("mhtml"));
    }
}
