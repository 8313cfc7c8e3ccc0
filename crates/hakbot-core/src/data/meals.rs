use serde::{Deserialize, Serialize};

use super::csv_records;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRecord {
    /// ISO date, "YYYY-MM-DD".
    pub date: String,
    pub menu: String,
    pub source: String,
}

/// Parse `meals.csv`: `date,<menu fields...>,source`.
///
/// Header rows (first field `date`) are skipped wherever they appear. An
/// unquoted menu that spills over several columns is re-joined with ",".
pub fn parse_meals(content: &str) -> Result<Vec<MealRecord>> {
    let mut meals = Vec::new();
    for fields in csv_records(content)? {
        if fields[0] == "date" {
            continue;
        }
        if fields.len() < 2 {
            tracing::debug!("meals: skipping row with {} field(s): {:?}", fields.len(), fields);
            continue;
        }
        let last = fields.len() - 1;
        let menu = fields[1..last].join(",");
        meals.push(MealRecord {
            date: fields[0].clone(),
            menu: menu.trim_matches('"').trim().to_string(),
            source: fields[last].clone(),
        });
    }
    Ok(meals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_header() {
        let csv = "date,menu,source\n2025-09-19,Fried Rice,school\n2025-09-20,Bibimbap,neis\n";
        let meals = parse_meals(csv).unwrap();
        assert_eq!(meals.len(), 2);
        assert_eq!(
            meals[0],
            MealRecord {
                date: "2025-09-19".into(),
                menu: "Fried Rice".into(),
                source: "school".into(),
            }
        );
        assert_eq!(meals[1].source, "neis");
    }

    #[test]
    fn test_quoted_menu_keeps_commas() {
        let csv = "date,menu,source\n2025-09-19,\"Fried Rice, Miso Soup, Egg\",school\n";
        let meals = parse_meals(csv).unwrap();
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].menu, "Fried Rice, Miso Soup, Egg");
        assert_eq!(meals[0].source, "school");
    }

    #[test]
    fn test_unquoted_menu_columns_rejoined() {
        let csv = "date,menu1,menu2,menu3,source\n2025-09-19,Rice,Soup,Kimchi,school\n";
        let meals = parse_meals(csv).unwrap();
        assert_eq!(meals[0].menu, "Rice,Soup,Kimchi");
        assert_eq!(meals[0].source, "school");
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let csv = "date,menu,source\n\n  2025-09-19 , Noodles , cafeteria \n\n";
        let meals = parse_meals(csv).unwrap();
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].date, "2025-09-19");
        assert_eq!(meals[0].menu, "Noodles");
        assert_eq!(meals[0].source, "cafeteria");
    }

    #[test]
    fn test_two_columns_has_empty_menu() {
        let meals = parse_meals("2025-09-19,school\n").unwrap();
        assert_eq!(meals[0].menu, "");
        assert_eq!(meals[0].source, "school");
    }

    #[test]
    fn test_single_field_rows_skipped() {
        let meals = parse_meals("date,menu,source\n2025-09-19\n").unwrap();
        assert!(meals.is_empty());
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_meals("").unwrap().is_empty());
    }
}
