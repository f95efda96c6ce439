//! Exchange-program dashboard sections.
//!
//! Each section is a pure function of a cleaned snapshot, so sections can be
//! built and tested one at a time. Captions are derived from the statistics
//! computed for the same artifact.

use crate::report::Section;
use crate::report::artifact::{
    Artifact, ArtifactKind, BoxGroup, LabeledValue, Orientation, Point, Series, Slice,
    ViolinGroup,
};
use crate::report::dataset::Dataset;
use crate::report::stats::{
    BoxStats, Summary, crosstab, gaussian_kde, histogram, pearson, top_labels, value_counts,
};
use anyhow::{Result, bail};
use serde_json::{Value, json};

pub const HOST_UNIVERSITY: &str = "Name of Host University";
pub const MAJOR: &str = "Major";
pub const GPA: &str = "GPA";
pub const SPONSOR: &str = "Sponsor Name";
pub const COMPLETED_HOURS: &str = "Total Completed Hours";
pub const TEST_SCORE: &str = "IELTS/TOEFL Score";
pub const TEST_TYPE: &str = "Test Type";
pub const HOST_GPA: &str = "Host GPA";
pub const GPA_DIFFERENCE: &str = "GPA Difference";

pub const FULLY_KFUPM: &str = "Fully KFUPM";
pub const PARTIALLY_KFUPM: &str = "Partially KFUPM";

/// Scores at or below this are IELTS bands; anything above is a TOEFL score.
const IELTS_MAX_BAND: f64 = 9.5;
const PREVIEW_ROWS: usize = 5;
const DENSITY_POINTS: usize = 64;

const SPONSOR_RENAMES: &[(&str, &str)] = &[
    ("Fully Sponsored by KFUPM", FULLY_KFUPM),
    ("KFUPM-Partial Sponsor", PARTIALLY_KFUPM),
];
const UNIVERSITY_ALIASES: &[(&str, &str)] =
    &[("University of Arizona", "Arizona State University")];

pub const STUDENT_SECTIONS: &[Section] = &[
    Section::new("Raw Data Preview", raw_preview),
    Section::new("Top Host Universities", host_universities),
    Section::new("Top Majors", majors),
    Section::new("GPA by Sponsor", gpa_by_sponsor),
    Section::new("GPA by Major", gpa_by_major),
    Section::new("Total Completed Hours Distribution", completed_hours),
    Section::new("Test Type Tagging & Score Distribution", test_scores),
];

pub const GPA_SECTIONS: &[Section] = &[
    Section::new("GPA Comparison (KFUPM vs Host)", gpa_comparison),
    Section::new("GPA Difference", gpa_difference),
];

/// Normalize sponsor names and, when requested, merge university aliases.
pub fn clean_students(students: &Dataset, merge_university_aliases: bool) -> Dataset {
    let cleaned = students.with_replacements(SPONSOR, SPONSOR_RENAMES);
    if merge_university_aliases {
        cleaned.with_replacements(HOST_UNIVERSITY, UNIVERSITY_ALIASES)
    } else {
        cleaned
    }
}

/// Full dashboard: student sections, then the GPA comparison when available.
pub fn exchange_report(students: &Dataset, gpa: Option<&Dataset>) -> Result<Vec<Artifact>> {
    let cleaned = clean_students(students, true);
    let mut artifacts = Vec::new();
    for section in STUDENT_SECTIONS {
        artifacts.extend(section.build(&cleaned)?);
    }
    if let Some(gpa) = gpa {
        for section in GPA_SECTIONS {
            artifacts.extend(section.build(gpa)?);
        }
    }
    Ok(artifacts)
}

/// Student sections only, without university alias merging.
pub fn basic_stats_report(students: &Dataset) -> Result<Vec<Artifact>> {
    let cleaned = clean_students(students, false);
    let mut artifacts = Vec::new();
    for section in STUDENT_SECTIONS {
        artifacts.extend(section.build(&cleaned)?);
    }
    Ok(artifacts)
}

fn raw_preview(data: &Dataset) -> Result<Vec<Artifact>> {
    let headers: Vec<String> = data.columns().into_iter().map(str::to_string).collect();
    let rows: Vec<Vec<String>> = data
        .records()
        .iter()
        .take(PREVIEW_ROWS)
        .map(|record| {
            headers
                .iter()
                .map(|header| cell_text(record.get(header)))
                .collect()
        })
        .collect();
    let caption = format!(
        "{} students across {} columns; first {} rows shown.",
        data.len(),
        headers.len(),
        rows.len()
    );
    Ok(vec![Artifact {
        name: "raw_preview".into(),
        caption,
        kind: ArtifactKind::Table { headers, rows },
    }])
}

fn host_universities(data: &Dataset) -> Result<Vec<Artifact>> {
    let counts = nonempty_counts(data, HOST_UNIVERSITY)?;
    let total: usize = counts.iter().map(|(_, count)| count).sum();

    let top5 = &counts[..counts.len().min(5)];
    let top5_total: usize = top5.iter().map(|(_, count)| count).sum();
    let slices = top5
        .iter()
        .map(|(label, count)| Slice {
            label: label.clone(),
            count: *count,
            percent: percent(*count, top5_total),
        })
        .collect();
    let (leader, leader_count) = &counts[0];
    let pie = Artifact {
        name: "top5_host_universities".into(),
        caption: format!(
            "{leader} hosted the most students: {leader_count} of {total} ({:.1}%). \
             The top {} universities account for {:.1}% of placements.",
            percent(*leader_count, total),
            top5.len(),
            percent(top5_total, total)
        ),
        kind: ArtifactKind::Pie { slices },
    };

    let top7 = &counts[..counts.len().min(7)];
    let table = Artifact {
        name: "top7_host_universities".into(),
        caption: format!("Student counts for the {} busiest host universities.", top7.len()),
        kind: ArtifactKind::Table {
            headers: vec!["University".into(), "Count".into()],
            rows: top7
                .iter()
                .map(|(label, count)| vec![label.clone(), count.to_string()])
                .collect(),
        },
    };
    let bar = Artifact {
        name: "top7_host_universities_bar".into(),
        caption: format!(
            "{} distinct host universities appear in the sample.",
            counts.len()
        ),
        kind: ArtifactKind::Bar {
            orientation: Orientation::Vertical,
            x_label: "University".into(),
            y_label: "Count".into(),
            bars: labeled(top7),
        },
    };

    let top7_labels = top_labels(&counts, 7);
    let pairs = label_pairs(data, HOST_UNIVERSITY, MAJOR)?;
    let major_columns = top_labels(
        &value_counts(
            pairs
                .iter()
                .filter(|(uni, _)| top7_labels.contains(uni))
                .map(|(_, major)| major.as_str()),
        ),
        usize::MAX,
    );
    let cells = crosstab(&pairs, &top7_labels, &major_columns);
    let heatmap = Artifact {
        name: "top7_universities_vs_majors".into(),
        caption: busiest_cell(&top7_labels, &major_columns, &cells)
            .map(|(uni, major, count)| {
                format!("Busiest pairing: {major} students at {uni} ({count}).")
            })
            .unwrap_or_else(|| "No university/major pairs recorded.".into()),
        kind: ArtifactKind::Heatmap {
            rows: top7_labels,
            columns: major_columns,
            cells,
        },
    };

    Ok(vec![pie, table, bar, heatmap])
}

fn majors(data: &Dataset) -> Result<Vec<Artifact>> {
    let counts = nonempty_counts(data, MAJOR)?;
    let total: usize = counts.iter().map(|(_, count)| count).sum();
    let top10 = &counts[..counts.len().min(10)];
    let top10_total: usize = top10.iter().map(|(_, count)| count).sum();
    let (leader, leader_count) = &counts[0];
    let bar = Artifact {
        name: "top10_majors".into(),
        caption: format!(
            "{leader} is the most common major with {leader_count} students; \
             the top {} majors cover {:.1}% of the sample.",
            top10.len(),
            percent(top10_total, total)
        ),
        kind: ArtifactKind::Bar {
            orientation: Orientation::Horizontal,
            x_label: "Number of Students".into(),
            y_label: "Major".into(),
            bars: labeled(top10),
        },
    };

    let universities = top_labels(&nonempty_counts(data, HOST_UNIVERSITY)?, 5);
    let top5_majors = top_labels(&counts, 5);
    let pairs = label_pairs(data, HOST_UNIVERSITY, MAJOR)?;
    let cells = crosstab(&pairs, &universities, &top5_majors);
    let series = top5_majors
        .iter()
        .enumerate()
        .map(|(col, major)| Series {
            name: major.clone(),
            values: cells.iter().map(|row| row[col]).collect(),
        })
        .collect();
    let covered: u64 = cells.iter().flatten().sum();
    let in_top_majors: usize = counts.iter().take(5).map(|(_, count)| count).sum();
    let grouped = Artifact {
        name: "top5_universities_vs_top5_majors".into(),
        caption: format!(
            "The top {} universities host {covered} of the {in_top_majors} students \
             in the top {} majors.",
            universities.len(),
            top5_majors.len()
        ),
        kind: ArtifactKind::GroupedBar {
            groups: universities,
            series,
        },
    };

    Ok(vec![bar, grouped])
}

fn gpa_by_sponsor(data: &Dataset) -> Result<Vec<Artifact>> {
    let sponsors = top_labels(&nonempty_counts(data, SPONSOR)?, 7);
    let groups = box_groups(&data.labeled_values(SPONSOR, GPA)?, &sponsors);
    let caption = median_extremes(&groups)
        .map(|((high, high_median), (low, low_median))| {
            format!(
                "Highest median GPA: {high} ({high_median:.2}); lowest: {low} ({low_median:.2})."
            )
        })
        .unwrap_or_else(|| "No GPA values recorded for the top sponsors.".into());
    let mut artifacts = vec![Artifact {
        name: "gpa_by_sponsor".into(),
        caption,
        kind: ArtifactKind::BoxPlot {
            value_label: GPA.into(),
            groups,
        },
    }];

    let pairs = data.labeled_values(SPONSOR, GPA)?;
    for sponsor in [FULLY_KFUPM, PARTIALLY_KFUPM] {
        let values: Vec<f64> = pairs
            .iter()
            .filter(|(label, _)| label == sponsor)
            .map(|(_, value)| *value)
            .collect();
        let Some(stats) = BoxStats::from_values(&values) else {
            continue;
        };
        let slug = slugify(sponsor);
        let summary = &stats.summary;
        artifacts.push(Artifact {
            name: format!("gpa_histogram_{slug}"),
            caption: format!(
                "{sponsor}: {} students, median GPA {:.2}, middle half between {:.2} and {:.2}.",
                summary.count, summary.median, summary.q1, summary.q3
            ),
            kind: ArtifactKind::Histogram {
                value_label: GPA.into(),
                bins: histogram(&values, 15),
                density: gaussian_kde(&values, DENSITY_POINTS),
            },
        });
        artifacts.push(Artifact {
            name: format!("gpa_box_{slug}"),
            caption: format!(
                "{sponsor}: GPA ranges from {:.2} to {:.2} with {} outlier(s).",
                summary.min,
                summary.max,
                stats.outliers.len()
            ),
            kind: ArtifactKind::BoxPlot {
                value_label: GPA.into(),
                groups: vec![BoxGroup {
                    label: sponsor.to_string(),
                    stats,
                }],
            },
        });
    }

    Ok(artifacts)
}

fn gpa_by_major(data: &Dataset) -> Result<Vec<Artifact>> {
    let counts = nonempty_counts(data, MAJOR)?;
    let top10 = top_labels(&counts, 10);
    let pairs = data.labeled_values(MAJOR, GPA)?;
    let groups = box_groups(&pairs, &top10);

    let medians: Vec<String> = groups
        .iter()
        .map(|group| format!("{} {:.2}", group.label, group.stats.summary.median))
        .collect();
    let box_caption = match median_extremes(&groups) {
        Some(((high, high_median), (low, low_median))) => format!(
            "{high} has the highest median GPA ({high_median:.2}) and {low} the lowest ({low_median:.2})."
        ),
        None => "No GPA values recorded for the top majors.".into(),
    };

    let violins = groups
        .iter()
        .map(|group| {
            let values: Vec<f64> = pairs
                .iter()
                .filter(|(label, _)| *label == group.label)
                .map(|(_, value)| *value)
                .collect();
            ViolinGroup {
                label: group.label.clone(),
                stats: group.stats.clone(),
                density: gaussian_kde(&values, DENSITY_POINTS),
            }
        })
        .collect();

    let table_rows = groups
        .iter()
        .map(|group| {
            let summary = &group.stats.summary;
            vec![
                group.label.clone(),
                summary.count.to_string(),
                format!("{:.2}", summary.median),
                format!("{:.2}", summary.q1),
                format!("{:.2}", summary.q3),
            ]
        })
        .collect();

    Ok(vec![
        Artifact {
            name: "gpa_by_major_box".into(),
            caption: box_caption,
            kind: ArtifactKind::BoxPlot {
                value_label: GPA.into(),
                groups: groups.clone(),
            },
        },
        Artifact {
            name: "gpa_by_major_violin".into(),
            caption: format!(
                "Median GPA by major, most popular first: {}.",
                medians.join(", ")
            ),
            kind: ArtifactKind::Violin {
                value_label: GPA.into(),
                groups: violins,
            },
        },
        Artifact {
            name: "median_gpa_by_major".into(),
            caption: "Median and interquartile range of GPA for the top majors.".into(),
            kind: ArtifactKind::Table {
                headers: vec![
                    "Major".into(),
                    "Students".into(),
                    "Median GPA".into(),
                    "Q1".into(),
                    "Q3".into(),
                ],
                rows: table_rows,
            },
        },
    ])
}

fn completed_hours(data: &Dataset) -> Result<Vec<Artifact>> {
    let values = data.numeric_values(COMPLETED_HOURS)?;
    let Some(summary) = Summary::describe(&values) else {
        bail!("column '{COMPLETED_HOURS}' has no values");
    };
    let bins = histogram(&values, 20);
    let caption = match bins.iter().max_by_key(|bin| bin.count) {
        Some(peak) => format!(
            "Most common range: {:.0} to {:.0} hours ({} students); values span {:.0} to {:.0} with median {:.0}.",
            peak.start, peak.end, peak.count, summary.min, summary.max, summary.median
        ),
        None => "No completed-hours values recorded.".into(),
    };
    Ok(vec![Artifact {
        name: "completed_hours".into(),
        caption,
        kind: ArtifactKind::Histogram {
            value_label: COMPLETED_HOURS.into(),
            bins,
            density: gaussian_kde(&values, DENSITY_POINTS),
        },
    }])
}

fn test_scores(data: &Dataset) -> Result<Vec<Artifact>> {
    // Surface type errors in the score column before deriving from it.
    data.numeric_column(TEST_SCORE)?;
    let tagged = data.with_derived(TEST_TYPE, |record| {
        let score = crate::report::dataset::numeric_cell(record, TEST_SCORE, 0).ok()??;
        Some(json!(test_type(score)))
    });

    let counts = value_counts(tagged.text_column(TEST_TYPE)?.into_iter().flatten());
    let mut artifacts = vec![Artifact {
        name: "test_type_counts".into(),
        caption: counts
            .iter()
            .map(|(label, count)| format!("{label}: {count}"))
            .collect::<Vec<_>>()
            .join(", "),
        kind: ArtifactKind::Table {
            headers: vec![TEST_TYPE.into(), "Count".into()],
            rows: counts
                .iter()
                .map(|(label, count)| vec![label.clone(), count.to_string()])
                .collect(),
        },
    }];

    let pairs = tagged.labeled_values(TEST_TYPE, TEST_SCORE)?;
    for kind in ["IELTS", "TOEFL"] {
        let values: Vec<f64> = pairs
            .iter()
            .filter(|(label, _)| label == kind)
            .map(|(_, value)| *value)
            .collect();
        let Some(stats) = BoxStats::from_values(&values) else {
            continue;
        };
        let summary = &stats.summary;
        artifacts.push(Artifact {
            name: format!("{}_scores", kind.to_lowercase()),
            caption: format!(
                "{kind}: median {:.1}, IQR {:.1} to {:.1}, whiskers {:.1} to {:.1}.",
                summary.median, summary.q1, summary.q3, stats.whisker_low, stats.whisker_high
            ),
            kind: ArtifactKind::BoxPlot {
                value_label: TEST_SCORE.into(),
                groups: vec![BoxGroup {
                    label: kind.to_string(),
                    stats,
                }],
            },
        });
    }
    Ok(artifacts)
}

fn gpa_comparison(data: &Dataset) -> Result<Vec<Artifact>> {
    let pairs = data.numeric_pairs(GPA, HOST_GPA)?;
    if pairs.is_empty() {
        bail!("no students have both '{GPA}' and '{HOST_GPA}'");
    }
    let dropped = pairs.iter().filter(|(home, host)| host < home).count();
    let correlation = pearson(&pairs)
        .map(|r| format!("correlation r = {r:.2}"))
        .unwrap_or_else(|| "correlation undefined".into());
    Ok(vec![Artifact {
        name: "kfupm_vs_host_gpa".into(),
        caption: format!(
            "{} students, {correlation}; {dropped} ({:.1}%) earned a lower GPA abroad.",
            pairs.len(),
            percent(dropped, pairs.len())
        ),
        kind: ArtifactKind::Scatter {
            x_label: "KFUPM GPA".into(),
            y_label: "Host GPA".into(),
            points: pairs.iter().map(|&(x, y)| Point { x, y }).collect(),
        },
    }])
}

fn gpa_difference(data: &Dataset) -> Result<Vec<Artifact>> {
    data.numeric_column(GPA)?;
    data.numeric_column(HOST_GPA)?;
    let with_diff = data.with_derived(GPA_DIFFERENCE, |record| {
        let home = crate::report::dataset::numeric_cell(record, GPA, 0).ok()??;
        let host = crate::report::dataset::numeric_cell(record, HOST_GPA, 0).ok()??;
        Some(json!(home - host))
    });
    let values = with_diff.numeric_values(GPA_DIFFERENCE)?;
    let Some(stats) = BoxStats::from_values(&values) else {
        bail!("no students have both '{GPA}' and '{HOST_GPA}'");
    };
    let summary = stats.summary.clone();
    let improved = values.iter().filter(|v| **v < 0.0).count();

    let describe_headers = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
    let describe_row = vec![
        summary.count.to_string(),
        format!("{:.3}", summary.mean),
        format!("{:.3}", summary.std),
        format!("{:.3}", summary.min),
        format!("{:.3}", summary.q1),
        format!("{:.3}", summary.median),
        format!("{:.3}", summary.q3),
        format!("{:.3}", summary.max),
    ];

    Ok(vec![
        Artifact {
            name: "gpa_difference_stats".into(),
            caption: format!(
                "Average change of {:.2} GPA points (KFUPM minus host) across {} students.",
                summary.mean, summary.count
            ),
            kind: ArtifactKind::Table {
                headers: describe_headers.iter().map(|h| h.to_string()).collect(),
                rows: vec![describe_row],
            },
        },
        Artifact {
            name: "gpa_difference_histogram".into(),
            caption: format!(
                "{improved} of {} students ({:.1}%) scored higher abroad.",
                summary.count,
                percent(improved, summary.count)
            ),
            kind: ArtifactKind::Histogram {
                value_label: GPA_DIFFERENCE.into(),
                bins: histogram(&values, 20),
                density: Vec::new(),
            },
        },
        Artifact {
            name: "gpa_difference_box".into(),
            caption: format!(
                "Median drop of {:.2} points; the middle half falls between {:.2} and {:.2}, \
                 whiskers reach {:.2} to {:.2}.",
                summary.median, summary.q1, summary.q3, stats.whisker_low, stats.whisker_high
            ),
            kind: ArtifactKind::BoxPlot {
                value_label: GPA_DIFFERENCE.into(),
                groups: vec![BoxGroup {
                    label: GPA_DIFFERENCE.into(),
                    stats,
                }],
            },
        },
    ])
}

pub fn test_type(score: f64) -> &'static str {
    if score <= IELTS_MAX_BAND { "IELTS" } else { "TOEFL" }
}

fn nonempty_counts(data: &Dataset, column: &str) -> Result<Vec<(String, usize)>> {
    let counts = value_counts(
        data.text_column(column)?
            .into_iter()
            .flatten()
            .filter(|value| !value.is_empty()),
    );
    if counts.is_empty() {
        bail!("column '{column}' has no values");
    }
    Ok(counts)
}

fn label_pairs(data: &Dataset, rows: &str, columns: &str) -> Result<Vec<(String, String)>> {
    let left = data.text_column(rows)?;
    let right = data.text_column(columns)?;
    Ok(left
        .into_iter()
        .zip(right)
        .filter_map(|(row, column)| Some((row?, column?)))
        .collect())
}

fn box_groups(pairs: &[(String, f64)], labels: &[String]) -> Vec<BoxGroup> {
    labels
        .iter()
        .filter_map(|label| {
            let values: Vec<f64> = pairs
                .iter()
                .filter(|(candidate, _)| candidate == label)
                .map(|(_, value)| *value)
                .collect();
            BoxStats::from_values(&values).map(|stats| BoxGroup {
                label: label.clone(),
                stats,
            })
        })
        .collect()
}

type LabeledMedian = (String, f64);

fn median_extremes(groups: &[BoxGroup]) -> Option<(LabeledMedian, LabeledMedian)> {
    let high = groups
        .iter()
        .max_by(|a, b| a.stats.summary.median.total_cmp(&b.stats.summary.median))?;
    let low = groups
        .iter()
        .min_by(|a, b| a.stats.summary.median.total_cmp(&b.stats.summary.median))?;
    Some((
        (high.label.clone(), high.stats.summary.median),
        (low.label.clone(), low.stats.summary.median),
    ))
}

fn busiest_cell<'a>(
    rows: &'a [String],
    columns: &'a [String],
    cells: &[Vec<u64>],
) -> Option<(&'a str, &'a str, u64)> {
    let mut best: Option<(&str, &str, u64)> = None;
    for (r, row) in cells.iter().enumerate() {
        for (c, &count) in row.iter().enumerate() {
            if count > 0 && best.is_none_or(|(_, _, top)| count > top) {
                best = Some((rows[r].as_str(), columns[c].as_str(), count));
            }
        }
    }
    best
}

fn labeled(counts: &[(String, usize)]) -> Vec<LabeledValue> {
    counts
        .iter()
        .map(|(label, count)| LabeledValue {
            label: label.clone(),
            value: *count as f64,
        })
        .collect()
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn slugify(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student(uni: &str, major: &str, gpa: f64, sponsor: &str, hours: f64, score: f64) -> Value {
        json!({
            HOST_UNIVERSITY: uni,
            MAJOR: major,
            GPA: gpa,
            SPONSOR: sponsor,
            COMPLETED_HOURS: hours,
            TEST_SCORE: score,
        })
    }

    fn sample() -> Dataset {
        let rows = vec![
            student("Colorado School of Mines", "ME", 3.6, "Fully Sponsored by KFUPM", 38.0, 7.0),
            student("Colorado School of Mines", "EE", 3.2, "KFUPM-Partial Sponsor", 40.0, 85.0),
            student("University of Florida", "ME", 3.8, "Fully Sponsored by KFUPM", 70.0, 6.5),
            student("University of Arizona", "ISE", 2.9, "SABIC", 36.0, 78.0),
            student("Georgia Tech", "ME", 3.4, "KFUPM-Partial Sponsor", 42.0, 7.5),
            student("Georgia Tech", "CHE", 3.1, "SAUDI ARAMCO", 65.0, 90.0),
        ];
        Dataset::parse(&serde_json::to_string(&rows).unwrap()).unwrap()
    }

    fn names(artifacts: &[Artifact]) -> Vec<&str> {
        artifacts.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn clean_students_renames_sponsors_and_aliases() {
        let cleaned = clean_students(&sample(), true);
        let sponsors = cleaned.text_column(SPONSOR).unwrap();
        assert_eq!(sponsors[0].as_deref(), Some(FULLY_KFUPM));
        assert_eq!(sponsors[1].as_deref(), Some(PARTIALLY_KFUPM));
        let unis = cleaned.text_column(HOST_UNIVERSITY).unwrap();
        assert_eq!(unis[3].as_deref(), Some("Arizona State University"));

        let basic = clean_students(&sample(), false);
        assert_eq!(
            basic.text_column(HOST_UNIVERSITY).unwrap()[3].as_deref(),
            Some("University of Arizona")
        );
    }

    #[test]
    fn report_sequence_is_deterministic() {
        let first = exchange_report(&sample(), None).unwrap();
        let second = exchange_report(&sample(), None).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            names(&first)[..5],
            [
                "raw_preview",
                "top5_host_universities",
                "top7_host_universities",
                "top7_host_universities_bar",
                "top7_universities_vs_majors",
            ]
        );
        assert!(names(&first).contains(&"gpa_histogram_fully_kfupm"));
        assert!(names(&first).contains(&"gpa_box_partially_kfupm"));
        assert!(names(&first).contains(&"ielts_scores"));
        assert!(names(&first).contains(&"toefl_scores"));
        assert!(!names(&first).contains(&"kfupm_vs_host_gpa"));
    }

    #[test]
    fn captions_come_from_computed_statistics() {
        let artifacts = exchange_report(&sample(), None).unwrap();
        let pie = artifacts
            .iter()
            .find(|a| a.name == "top5_host_universities")
            .unwrap();
        assert!(pie.caption.starts_with("Colorado School of Mines hosted the most students: 2 of 6"));

        let majors = artifacts.iter().find(|a| a.name == "top10_majors").unwrap();
        assert!(majors.caption.starts_with("ME is the most common major with 3 students"));

        let violin = artifacts
            .iter()
            .find(|a| a.name == "gpa_by_major_violin")
            .unwrap();
        assert!(violin.caption.contains("ME 3.60"), "{}", violin.caption);
    }

    #[test]
    fn test_type_splits_on_band_threshold() {
        assert_eq!(test_type(9.5), "IELTS");
        assert_eq!(test_type(9.6), "TOEFL");
        let artifacts = test_scores(&sample()).unwrap();
        assert_eq!(artifacts[0].caption, "IELTS: 3, TOEFL: 3");
    }

    #[test]
    fn gpa_sections_compute_difference() {
        let gpa = Dataset::parse(
            r#"[{"GPA": 3.5, "Host GPA": 3.0}, {"GPA": 3.0, "Host GPA": 3.2}, {"GPA": 3.8, "Host GPA": 3.4}]"#,
        )
        .unwrap();
        let artifacts = exchange_report(&sample(), Some(&gpa)).unwrap();
        let scatter = artifacts
            .iter()
            .find(|a| a.name == "kfupm_vs_host_gpa")
            .unwrap();
        assert!(scatter.caption.contains("2 (66.7%) earned a lower GPA abroad"));

        let hist = artifacts
            .iter()
            .find(|a| a.name == "gpa_difference_histogram")
            .unwrap();
        assert!(hist.caption.starts_with("1 of 3 students"));
        let ArtifactKind::Table { rows, .. } = &artifacts
            .iter()
            .find(|a| a.name == "gpa_difference_stats")
            .unwrap()
            .kind
        else {
            panic!("expected table");
        };
        assert_eq!(rows[0][0], "3");
        assert_eq!(rows[0][5], "0.400");
    }

    #[test]
    fn missing_column_fails_the_section() {
        let data = Dataset::parse(r#"[{"Major": "ME", "GPA": 3.0}]"#).unwrap();
        let err = exchange_report(&data, None).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Top Host Universities"), "{message}");
        assert!(message.contains("column 'Name of Host University' not found"));
    }
}
