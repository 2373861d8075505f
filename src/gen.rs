//! Random record generation for demos, benches and stress tests.

use rand::Rng;

use crate::model::{days_in_month, Article, Category, Date, Product, Sale};

const NAMES: &[&str] = &[
    "Desk lamp",
    "Wool coat",
    "Oak table",
    "Headphones",
    "Armchair",
    "Raincoat",
    "Monitor",
    "Bookshelf",
    "Kettle",
    "Sneakers",
];

const CASHIERS: &[&str] = &["Ann", "Bob", "Clara", "Dmitri", "Elena", "Farid"];

fn random_article<R: Rng>(rng: &mut R) -> Article {
    let category = Category::ALL[rng.gen_range(0..Category::ALL.len())];
    Article::new(category, rng.gen_range(10_000..100_000))
}

fn random_date<R: Rng>(rng: &mut R) -> Date {
    let year = rng.gen_range(2001..2026);
    let month = rng.gen_range(1..13);
    let day = rng.gen_range(1..=days_in_month(year, month));
    Date { year, month, day }
}

/// `count` random products. Articles may repeat; the catalog's duplicate
/// handling decides what survives.
pub fn generate_products<R: Rng>(count: usize, rng: &mut R) -> Vec<Product> {
    (0..count)
        .map(|_| {
            let price = rng.gen::<f64>() * 10f64.powi(rng.gen_range(1..5));
            let price = (price * 100.0).round() / 100.0;
            Product::new(
                random_article(rng),
                NAMES[rng.gen_range(0..NAMES.len())],
                price,
            )
        })
        .collect()
}

/// `count` random sales.
pub fn generate_sales<R: Rng>(count: usize, rng: &mut R) -> Vec<Sale> {
    (0..count)
        .map(|_| {
            Sale::new(
                random_article(rng),
                rng.gen_range(1..100),
                CASHIERS[rng.gen_range(0..CASHIERS.len())],
                random_date(rng),
            )
        })
        .collect()
}
