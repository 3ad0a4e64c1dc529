//! Food lookup over a prepared table.
//!
//! Search is a case-insensitive substring match on the food name, returning
//! matches in table order. Callers list the first [`PREVIEW_LIMIT`] and may
//! select any match by its 1-based position.

use serde::Serialize;
use std::io::{self, BufRead, Write};

use crate::config::NutrientGroup;
use crate::models::{Basis, FoodNutrientRow, Measure, NutrientTable, FOOD_NAME_COLUMN};

/// Matches listed before the "... and N more" line.
pub const PREVIEW_LIMIT: usize = 10;

/// Rows whose name contains `query`, ignoring case.
pub fn search<'a>(table: &'a NutrientTable, query: &str) -> Vec<&'a FoodNutrientRow> {
    let needle = query.to_lowercase();
    table
        .rows
        .iter()
        .filter(|row| row.food_name.to_lowercase().contains(&needle))
        .collect()
}

/// Numbered listing of the first matches.
pub fn preview(matches: &[&FoodNutrientRow]) -> Vec<String> {
    let mut lines: Vec<String> = matches
        .iter()
        .take(PREVIEW_LIMIT)
        .enumerate()
        .map(|(i, row)| format!("{}. {} (FDC ID: {})", i + 1, row.food_name, row.food_id))
        .collect();

    if let Some(more) = more_message(matches.len()) {
        lines.push(more);
    }
    lines
}

/// Hint shown when matches exceed the preview.
pub fn more_message(total: usize) -> Option<String> {
    (total > PREVIEW_LIMIT).then(|| {
        format!(
            "... and {} more. Refine your search or select from the top {}.",
            total - PREVIEW_LIMIT,
            PREVIEW_LIMIT
        )
    })
}

/// Every field of a row except the id, as `(column, value)` pairs in column order.
pub fn details(table: &NutrientTable, row: &FoodNutrientRow) -> Vec<(String, String)> {
    std::iter::once((FOOD_NAME_COLUMN.to_string(), row.food_name.clone()))
        .chain(
            table
                .measure_columns()
                .into_iter()
                .zip(&row.measures)
                .map(|(column, measure)| (column, measure.to_string())),
        )
        .collect()
}

// =============================================================================
// Grouped details
// =============================================================================

/// One nutrient on all three bases.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutrientDetail {
    pub label: String,
    pub per_100g: Measure,
    pub per_gram: Measure,
    pub per_ounce: Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailGroup {
    pub name: String,
    pub nutrients: Vec<NutrientDetail>,
}

/// A food's values arranged by nutrient group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedDetails {
    pub food_id: i64,
    pub food_name: String,
    pub groups: Vec<DetailGroup>,
}

/// Arrange a row by `groups`; labels absent from the table are left out.
pub fn grouped_details(
    table: &NutrientTable,
    row: &FoodNutrientRow,
    groups: &[NutrientGroup],
) -> GroupedDetails {
    let groups = groups
        .iter()
        .map(|group| DetailGroup {
            name: group.name.clone(),
            nutrients: group
                .labels
                .iter()
                .filter_map(|label| {
                    let [per_100g, per_gram, per_ounce] =
                        Basis::ALL.map(|basis| table.measure(row, label, basis));
                    Some(NutrientDetail {
                        label: label.clone(),
                        per_100g: per_100g?,
                        per_gram: per_gram?,
                        per_ounce: per_ounce?,
                    })
                })
                .collect(),
        })
        .collect();

    GroupedDetails {
        food_id: row.food_id,
        food_name: row.food_name.clone(),
        groups,
    }
}

// =============================================================================
// Paging
// =============================================================================

/// A slice of the table for page-by-page browsing.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    pub rows: &'a [FoodNutrientRow],
    /// 1-based, after clamping
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Rows of page `page` (1-based). Out-of-range pages are clamped to the
/// first or last page; `per_page` is at least 1.
pub fn page(table: &NutrientTable, page: usize, per_page: usize) -> Page<'_> {
    let per_page = per_page.max(1);
    let total = table.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let start = ((page - 1) * per_page).min(total);
    let end = (start + per_page).min(total);

    Page {
        rows: &table.rows[start..end],
        page,
        per_page,
        total_pages,
        total,
    }
}

// =============================================================================
// Interactive session
// =============================================================================

const SEARCH_PROMPT: &str = "Enter food name to search (or 'q' to quit): ";
const CHOICE_PROMPT: &str =
    "Enter the number of the food to see details, (s) to search again, or (q) to quit: ";

/// Prompt loop over any line-based input and output.
pub struct Session<'t, R, W> {
    table: &'t NutrientTable,
    input: R,
    output: W,
}

enum Choice {
    SearchAgain,
    Quit,
}

impl<'t, R: BufRead, W: Write> Session<'t, R, W> {
    pub fn new(table: &'t NutrientTable, input: R, output: W) -> Self {
        Self { table, input, output }
    }

    /// Run until the user quits or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        while let Some(query) = self.prompt(SEARCH_PROMPT)? {
            if query.eq_ignore_ascii_case("q") {
                break;
            }
            if query.is_empty() {
                writeln!(self.output, "Please enter a food name to search.")?;
                continue;
            }

            let matches = search(self.table, &query);
            if matches.is_empty() {
                writeln!(
                    self.output,
                    "No food found matching '{}'. Try a different search term.",
                    query
                )?;
                continue;
            }

            writeln!(self.output, "\nFound {} matching food(s):", matches.len())?;
            for line in preview(&matches) {
                writeln!(self.output, "{}", line)?;
            }

            if let Choice::Quit = self.choose(&matches)? {
                break;
            }
        }

        writeln!(self.output, "Thank you for using the Food Nutrition App!")?;
        Ok(())
    }

    fn choose(&mut self, matches: &[&FoodNutrientRow]) -> io::Result<Choice> {
        loop {
            let Some(choice) = self.prompt(CHOICE_PROMPT)? else {
                return Ok(Choice::Quit);
            };
            let choice = choice.to_lowercase();

            match choice.as_str() {
                "q" => return Ok(Choice::Quit),
                "s" => return Ok(Choice::SearchAgain),
                _ => {}
            }

            match choice.parse::<i64>() {
                Ok(n) if n >= 1 && (n as usize) <= matches.len() => {
                    self.print_details(matches[n as usize - 1])?;
                }
                Ok(_) => writeln!(self.output, "Invalid number. Please try again.")?,
                Err(_) => writeln!(
                    self.output,
                    "Invalid input. Please enter a number, 's', or 'q'."
                )?,
            }
        }
    }

    fn print_details(&mut self, row: &FoodNutrientRow) -> io::Result<()> {
        writeln!(self.output, "\n--- Nutrition Details ---")?;
        for (column, value) in details(self.table, row) {
            writeln!(self.output, "{}: {}", column, value)?;
        }
        writeln!(self.output, "-------------------------\n")
    }

    /// Print a prompt and read one trimmed line; `None` at end of input.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;

    fn row(food_id: i64, name: &str, calories: Option<f64>) -> FoodNutrientRow {
        let measures = match calories {
            Some(c) => vec![
                Measure::Value(c),
                Measure::Value(c / 100.0),
                Measure::Value(c / 100.0 * 28.3495),
            ],
            None => vec![Measure::NotAvailable; 3],
        };
        FoodNutrientRow {
            food_id,
            food_name: name.into(),
            measures,
        }
    }

    fn table() -> NutrientTable {
        NutrientTable::new(
            vec!["Calories".into()],
            vec![
                row(1, "Apple, raw", Some(52.0)),
                row(2, "APPLESAUCE", Some(68.0)),
                row(3, "Banana", None),
            ],
        )
    }

    fn many(n: i64) -> NutrientTable {
        NutrientTable::new(
            vec!["Calories".into()],
            (1..=n).map(|i| row(i, &format!("Bread {}", i), Some(250.0))).collect(),
        )
    }

    fn run_session(table: &NutrientTable, input: &str) -> String {
        let mut output = Vec::new();
        Session::new(table, input.as_bytes(), &mut output).run().unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_search_case_insensitive_in_order() {
        let table = table();
        let names: Vec<&str> = search(&table, "apple")
            .iter()
            .map(|r| r.food_name.as_str())
            .collect();
        assert_eq!(names, vec!["Apple, raw", "APPLESAUCE"]);
        assert!(search(&table, "kiwi").is_empty());
    }

    #[test]
    fn test_preview_limits_to_ten() {
        let table = many(13);
        let matches = search(&table, "bread");
        let lines = preview(&matches);

        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "1. Bread 1 (FDC ID: 1)");
        assert_eq!(
            lines[10],
            "... and 3 more. Refine your search or select from the top 10."
        );
        assert!(more_message(10).is_none());
    }

    #[test]
    fn test_details_skip_id() {
        let table = table();
        let fields = details(&table, &table.rows[2]);

        assert_eq!(fields[0], ("food_name".to_string(), "Banana".to_string()));
        assert_eq!(fields[1], ("Calories (per 100g)".to_string(), "N/A".to_string()));
        assert_eq!(fields.len(), 4);
        assert!(fields.iter().all(|(c, _)| c != "food_id"));
    }

    #[test]
    fn test_grouped_details() {
        let table = table();
        let details = grouped_details(&table, &table.rows[0], &BuildConfig::default().groups);

        assert_eq!(details.groups.len(), 3);
        assert_eq!(details.groups[0].name, "Macros");
        assert_eq!(details.groups[0].nutrients.len(), 1);
        assert_eq!(details.groups[0].nutrients[0].per_100g, Measure::Value(52.0));
        assert!(details.groups[1].nutrients.is_empty());

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["foodName"], "Apple, raw");
        assert_eq!(json["groups"][0]["nutrients"][0]["per100g"], 52.0);
    }

    #[test]
    fn test_page_clamps() {
        let table = many(25);

        let p = page(&table, 2, 10);
        assert_eq!(p.rows.len(), 10);
        assert_eq!(p.rows[0].food_id, 11);
        assert_eq!(p.total_pages, 3);

        let last = page(&table, 99, 10);
        assert_eq!(last.page, 3);
        assert_eq!(last.rows.len(), 5);

        let first = page(&table, 0, 0);
        assert_eq!(first.page, 1);
        assert_eq!(first.per_page, 1);

        let no_rows = NutrientTable::default();
        let empty = page(&no_rows, 1, 10);
        assert_eq!(empty.total_pages, 1);
        assert!(empty.rows.is_empty());
    }

    #[test]
    fn test_session_search_and_details() {
        let out = run_session(&table(), "apple\n2\ns\nq\n");

        assert!(out.contains("Found 2 matching food(s):"));
        assert!(out.contains("1. Apple, raw (FDC ID: 1)"));
        assert!(out.contains("--- Nutrition Details ---\nfood_name: APPLESAUCE\nCalories (per 100g): 68.0"));
        assert!(out.ends_with("Thank you for using the Food Nutrition App!\n"));
    }

    #[test]
    fn test_session_messages() {
        let out = run_session(&table(), "\nkiwi\nbanana\n5\nabc\n0\nq\n");

        assert!(out.contains("Please enter a food name to search."));
        assert!(out.contains("No food found matching 'kiwi'. Try a different search term."));
        assert!(out.contains("Invalid number. Please try again."));
        assert!(out.contains("Invalid input. Please enter a number, 's', or 'q'."));
        assert_eq!(out.matches("Invalid number").count(), 2);
    }

    #[test]
    fn test_session_select_beyond_preview() {
        let out = run_session(&many(12), "bread\n12\nq\n");
        assert!(out.contains("food_name: Bread 12"));
    }

    #[test]
    fn test_session_ends_on_eof() {
        let out = run_session(&table(), "apple\n");
        assert!(out.ends_with("Thank you for using the Food Nutrition App!\n"));
    }
}
