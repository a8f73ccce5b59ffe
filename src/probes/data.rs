use crate::config::DataProbeConfig;
use crate::probes::ProbeError;
use crate::stats;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::time::Duration;

/// A sampled row from the `user_ips` table
#[derive(Debug, Clone, Deserialize)]
pub struct IpRecord {
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub last_seen: Option<String>,
    pub created_at: Option<String>,
}

/// A sampled row from the `test_records` table
#[derive(Debug, Clone, Deserialize)]
pub struct TestRecord {
    pub record_id: Option<String>,
    pub user_id: Option<String>,
    pub test_type: Option<String>,
    pub created_at: Option<String>,
}

/// A sampled row from the `test_results` table
#[derive(Debug, Clone, Deserialize)]
pub struct TestResult {
    pub record_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: Option<String>,
}

/// Error body shape the hosted store returns for failed queries
#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    message: String,
}

/// One section of the data probe report, covering a single query
#[derive(Debug, Clone)]
pub struct SectionReport {
    /// What the query was checking
    pub title: String,

    /// Error message when the query failed
    pub error: Option<String>,

    /// Number of rows fetched
    pub row_count: usize,

    /// Derived statistics and sample rows, one line each
    pub lines: Vec<String>,
}

impl SectionReport {
    fn failed(title: &str, error: &ProbeError) -> Self {
        Self {
            title: title.to_string(),
            error: Some(error.to_string()),
            row_count: 0,
            lines: Vec::new(),
        }
    }
}

/// Structured result of a full data probe run
#[derive(Debug, Clone, Default)]
pub struct DataProbeReport {
    pub sections: Vec<SectionReport>,
}

impl DataProbeReport {
    /// Number of queries that failed
    pub fn failed_sections(&self) -> usize {
        self.sections.iter().filter(|s| s.error.is_some()).count()
    }

    /// Render the report to the console
    pub fn print(&self) {
        println!("=== data probe ===");
        for section in &self.sections {
            println!("--- {} ---", section.title);
            match &section.error {
                Some(error) => println!("query failed: {}", error),
                None => {
                    println!("rows fetched: {}", section.row_count);
                    for line in &section.lines {
                        println!("  {}", line);
                    }
                }
            }
        }
        if self.failed_sections() > 0 {
            println!(
                "{} of {} queries failed",
                self.failed_sections(),
                self.sections.len()
            );
        }
    }
}

/// Read-only client for the hosted table store's REST interface
pub struct StoreClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl StoreClient {
    /// Build a client from configuration. The endpoint and key come from
    /// config or the environment; they are never compiled in.
    pub fn new(config: &DataProbeConfig) -> Result<Self, ProbeError> {
        if config.endpoint.is_empty() {
            return Err(ProbeError::Config("store endpoint is not set".to_string()));
        }
        if config.api_key.is_empty() {
            return Err(ProbeError::Config("store access key is not set".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Issue a select-style read query against a named table.
    ///
    /// `params` are PostgREST-style pairs: `select`, equality
    /// (`col=eq.value`), null checks (`col=is.null`), `order`, `limit`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, ProbeError> {
        let url = format!("{}/rest/v1/{}", self.endpoint, table);
        ::log::debug!("Store query: {} {:?}", url, params);

        let response = self
            .http
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<StoreErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            return Err(ProbeError::Store {
                table: table.to_string(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// Runs the fixed query battery and returns the collected report.
///
/// Each query is independent: a failure is recorded in its section and
/// the battery continues. Only client construction errors abort the run.
pub async fn run(config: &DataProbeConfig) -> Result<DataProbeReport, ProbeError> {
    let client = StoreClient::new(config)?;
    let mut report = DataProbeReport::default();

    let limit = config.sample_limit.to_string();

    // Recent ip records: geolocation coverage and ip format validity over
    // the sampled page only.
    let section = match client
        .select::<IpRecord>(
            "user_ips",
            &[
                ("select", "*"),
                ("order", "last_seen.desc"),
                ("limit", &limit),
            ],
        )
        .await
    {
        Ok(rows) => ip_sample_section(&rows),
        Err(e) => {
            ::log::error!("user_ips sample query failed: {}", e);
            SectionReport::failed("user_ips sample", &e)
        }
    };
    report.sections.push(section);

    // Rows with no country at all, to separate "lookup failed" from
    // "lookup never ran".
    let section = match client
        .select::<IpRecord>(
            "user_ips",
            &[
                ("select", "user_id,ip_address,country"),
                ("country", "is.null"),
                ("limit", "20"),
            ],
        )
        .await
    {
        Ok(rows) => {
            let mut lines = Vec::new();
            for row in rows.iter().take(5) {
                lines.push(format!(
                    "user {}: {}",
                    row.user_id.as_deref().unwrap_or("<none>"),
                    row.ip_address.as_deref().unwrap_or("<none>"),
                ));
            }
            SectionReport {
                title: "user_ips missing geolocation".to_string(),
                error: None,
                row_count: rows.len(),
                lines,
            }
        }
        Err(e) => {
            ::log::error!("user_ips null-country query failed: {}", e);
            SectionReport::failed("user_ips missing geolocation", &e)
        }
    };
    report.sections.push(section);

    // Recent test records, grouped client-side by test type.
    let mut sampled_record_ids: Option<HashSet<String>> = None;
    let section = match client
        .select::<TestRecord>(
            "test_records",
            &[("select", "*"), ("order", "created_at.desc"), ("limit", "20")],
        )
        .await
    {
        Ok(rows) => {
            sampled_record_ids = Some(
                rows.iter()
                    .filter_map(|r| r.record_id.clone())
                    .collect(),
            );
            test_record_section(&rows)
        }
        Err(e) => {
            ::log::error!("test_records query failed: {}", e);
            SectionReport::failed("test_records recent", &e)
        }
    };
    report.sections.push(section);

    // Recent test results, cross-checked against the sampled records.
    let section = match client
        .select::<TestResult>(
            "test_results",
            &[("select", "*"), ("order", "created_at.desc"), ("limit", "20")],
        )
        .await
    {
        Ok(rows) => test_result_section(&rows, sampled_record_ids.as_ref()),
        Err(e) => {
            ::log::error!("test_results query failed: {}", e);
            SectionReport::failed("test_results recent", &e)
        }
    };
    report.sections.push(section);

    Ok(report)
}

fn ip_sample_section(rows: &[IpRecord]) -> SectionReport {
    let coverage = stats::coverage_percent(rows.iter().map(|r| r.country.as_deref()));
    let valid_ips = stats::count_valid_ipv4(rows.iter().map(|r| r.ip_address.as_deref()));

    let mut lines = vec![
        format!("country coverage (sampled): {:.1}%", coverage),
        format!("valid ipv4 format: {} of {}", valid_ips, rows.len()),
    ];

    for row in rows.iter().take(5) {
        lines.push(format!(
            "user {}: {} {}/{} via {} on {}",
            row.user_id.as_deref().unwrap_or("<none>"),
            row.ip_address.as_deref().unwrap_or("<none>"),
            row.country.as_deref().unwrap_or("?"),
            row.city.as_deref().unwrap_or("?"),
            row.browser.as_deref().unwrap_or("?"),
            row.os.as_deref().unwrap_or("?"),
        ));
    }

    SectionReport {
        title: "user_ips sample".to_string(),
        error: None,
        row_count: rows.len(),
        lines,
    }
}

fn test_record_section(rows: &[TestRecord]) -> SectionReport {
    let mut by_type: Vec<(String, usize)> = Vec::new();
    for row in rows {
        let test_type = row.test_type.clone().unwrap_or_else(|| "<none>".to_string());
        match by_type.iter_mut().find(|(t, _)| *t == test_type) {
            Some((_, count)) => *count += 1,
            None => by_type.push((test_type, 1)),
        }
    }

    let lines = by_type
        .into_iter()
        .map(|(test_type, count)| format!("{}: {}", test_type, count))
        .collect();

    SectionReport {
        title: "test_records recent".to_string(),
        error: None,
        row_count: rows.len(),
        lines,
    }
}

fn test_result_section(
    rows: &[TestResult],
    sampled_record_ids: Option<&HashSet<String>>,
) -> SectionReport {
    let mut lines = Vec::new();

    if let Some(ids) = sampled_record_ids {
        let outside = rows
            .iter()
            .filter(|r| {
                r.record_id
                    .as_ref()
                    .map(|id| !ids.contains(id))
                    .unwrap_or(true)
            })
            .count();
        lines.push(format!(
            "{} results reference records outside the sampled window",
            outside
        ));
    }

    SectionReport {
        title: "test_results recent".to_string(),
        error: None,
        row_count: rows.len(),
        lines,
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_ip_sample_section_statistics() {
        let row = |ip: Option<&str>, country: Option<&str>| IpRecord {
            user_id: Some("u1".to_string()),
            ip_address: ip.map(str::to_string),
            country: country.map(str::to_string),
            city: None,
            device_type: None,
            browser: None,
            os: None,
            last_seen: None,
            created_at: None,
        };

        let rows = vec![
            row(Some("10.0.0.1"), Some("DE")),
            row(Some("999.1.1"), Some("unknown")),
            row(None, None),
            row(Some("192.168.1.1"), Some("US")),
        ];

        let section = ip_sample_section(&rows);
        assert_eq!(section.row_count, 4);
        assert_eq!(section.lines[0], "country coverage (sampled): 50.0%");
        assert_eq!(section.lines[1], "valid ipv4 format: 2 of 4");
    }

    #[test]
    fn test_test_record_grouping() {
        let record = |t: &str| TestRecord {
            record_id: None,
            user_id: None,
            test_type: Some(t.to_string()),
            created_at: None,
        };

        let section = test_record_section(&[record("a"), record("b"), record("a")]);
        assert_eq!(section.row_count, 3);
        assert!(section.lines.contains(&"a: 2".to_string()));
        assert!(section.lines.contains(&"b: 1".to_string()));
    }

    #[test]
    fn test_orphan_result_detection() {
        let ids: HashSet<String> = ["r1".to_string()].into_iter().collect();
        let result = |id: Option<&str>| TestResult {
            record_id: id.map(str::to_string),
            user_id: None,
            created_at: None,
        };

        let rows = vec![result(Some("r1")), result(Some("r9")), result(None)];
        let section = test_result_section(&rows, Some(&ids));
        assert_eq!(
            section.lines[0],
            "2 results reference records outside the sampled window"
        );
    }
}
