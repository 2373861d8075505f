//! Domain record types and their flat line encodings.
//!
//! Records are plain values; identity inside the engine is carried by
//! [`crate::store::NodeHandle`], never by the values themselves.

use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Product category, the prefix component of an [`Article`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Electronics,
    Clothing,
    Furniture,
    Other,
}

impl Category {
    /// All categories, in code order.
    pub const ALL: [Category; 4] = [
        Category::Electronics,
        Category::Clothing,
        Category::Furniture,
        Category::Other,
    ];

    fn code(self) -> &'static str {
        match self {
            Category::Electronics => "EL",
            Category::Clothing => "CL",
            Category::Furniture => "FUR",
            Category::Other => "OTH",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EL" => Ok(Category::Electronics),
            "CL" => Ok(Category::Clothing),
            "FUR" => Ok(Category::Furniture),
            "OTH" => Ok(Category::Other),
            other => Err(EngineError::InvalidRecord(format!(
                "unknown category {other:?}"
            ))),
        }
    }
}

/// Product code, e.g. `EL-12345`. Orders by category, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Article {
    pub category: Category,
    pub id: u32,
}

impl Article {
    pub fn new(category: Category, id: u32) -> Self {
        Self { category, id }
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.category, self.id)
    }
}

impl FromStr for Article {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, id) = s
            .split_once('-')
            .ok_or_else(|| EngineError::InvalidRecord(format!("bad article {s:?}")))?;
        let category = category.parse::<Category>()?;
        let id = id
            .parse::<u32>()
            .map_err(|_| EngineError::InvalidRecord(format!("bad article id {id:?}")))?;
        Ok(Article { category, id })
    }
}

/// Calendar date, rendered `dd.mm.yyyy`. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    /// Builds a validated date; month and day must fit the calendar.
    pub fn new(day: u8, month: u8, year: u16) -> Result<Self, EngineError> {
        if year == 0 || month == 0 || month > 12 || day == 0 || day > days_in_month(year, month) {
            return Err(EngineError::InvalidRecord(format!(
                "invalid date {day:02}.{month:02}.{year}"
            )));
        }
        Ok(Self { year, month, day })
    }
}

/// Days in `month` of `year`, leap-year aware.
pub fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
            if leap {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{}", self.day, self.month, self.year)
    }
}

impl FromStr for Date {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let (day, month, year) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(d), Some(m), Some(y), None) => (d, m, y),
            _ => {
                return Err(EngineError::InvalidRecord(format!(
                    "bad date {s:?}, expected dd.mm.yyyy"
                )))
            }
        };
        let parse = |part: &str| {
            part.parse::<u16>()
                .map_err(|_| EngineError::InvalidRecord(format!("bad date component {part:?}")))
        };
        let (day, month, year) = (parse(day)?, parse(month)?, parse(year)?);
        if day > u8::MAX as u16 || month > u8::MAX as u16 {
            return Err(EngineError::InvalidRecord(format!("bad date {s:?}")));
        }
        Date::new(day as u8, month as u8, year)
    }
}

/// A stocked product: `ARTICLE;NAME;PRICE` on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub article: Article,
    pub name: String,
    pub price: f64,
}

impl Product {
    pub fn new(article: Article, name: impl Into<String>, price: f64) -> Self {
        Self {
            article,
            name: name.into(),
            price,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.article, self.name, self.price)
    }
}

/// One sale line: `ARTICLE;COUNT;CASHIER;DATE` on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub article: Article,
    pub count: u32,
    pub cashier: String,
    pub date: Date,
}

impl Sale {
    pub fn new(article: Article, count: u32, cashier: impl Into<String>, date: Date) -> Self {
        Self {
            article,
            count,
            cashier: cashier.into(),
            date,
        }
    }
}

impl fmt::Display for Sale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{}",
            self.article, self.count, self.cashier, self.date
        )
    }
}

/// Parses a price, accepting both `49.99` and the legacy `49,99` form.
pub(crate) fn parse_price(s: &str) -> Result<f64, EngineError> {
    let normalized = s.replace(',', ".");
    normalized
        .parse::<f64>()
        .map_err(|_| EngineError::InvalidRecord(format!("bad price {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_round_trip() {
        let article: Article = "EL-12345".parse().unwrap();
        assert_eq!(article.category, Category::Electronics);
        assert_eq!(article.id, 12345);
        assert_eq!(article.to_string(), "EL-12345");
    }

    #[test]
    fn article_rejects_garbage() {
        assert!("EL12345".parse::<Article>().is_err());
        assert!("ZZ-1".parse::<Article>().is_err());
        assert!("FUR-abc".parse::<Article>().is_err());
    }

    #[test]
    fn article_ordering_is_category_then_id() {
        let a: Article = "EL-99".parse().unwrap();
        let b: Article = "CL-1".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn date_round_trip_and_padding() {
        let date: Date = "01.01.2020".parse().unwrap();
        assert_eq!(date, Date::new(1, 1, 2020).unwrap());
        assert_eq!(date.to_string(), "01.01.2020");
    }

    #[test]
    fn date_validates_calendar() {
        assert!("29.02.2020".parse::<Date>().is_ok());
        assert!("29.02.2021".parse::<Date>().is_err());
        assert!("31.04.2020".parse::<Date>().is_err());
        assert!("00.01.2020".parse::<Date>().is_err());
        assert!("01.13.2020".parse::<Date>().is_err());
    }

    #[test]
    fn date_orders_chronologically() {
        let early: Date = "31.12.2019".parse().unwrap();
        let late: Date = "01.01.2020".parse().unwrap();
        assert!(early < late);
    }

    #[test]
    fn legacy_comma_price() {
        assert_eq!(parse_price("49,99").unwrap(), 49.99);
        assert_eq!(parse_price("85.5").unwrap(), 85.5);
        assert!(parse_price("free").is_err());
    }
}
