//! Console frontend for the engine: generate sample data, run queries,
//! render the date tree and report structure statistics.
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use nu_ansi_term::Color;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use tilldb::{gen, io, Article, Catalog, Date, Result};

#[derive(Parser, Debug)]
#[command(
    name = "tilldb",
    version,
    about = "In-memory inventory/sales engine demo CLI",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate random product and sale files
    Generate {
        #[arg(long, default_value_t = 50)]
        products: usize,
        #[arg(long, default_value_t = 200)]
        sales: usize,
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
        #[arg(long, help = "RNG seed for reproducible output")]
        seed: Option<u64>,
    },
    /// Queries against loaded record files
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
    /// Render the date tree as an indented diagram
    Tree {
        #[arg(long, value_name = "FILE")]
        sales: PathBuf,
    },
    /// Structure statistics for loaded files
    Stats {
        #[arg(long, value_name = "FILE")]
        products: PathBuf,
        #[arg(long, value_name = "FILE")]
        sales: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// Product and its sales by article code, e.g. EL-12345
    Article {
        code: String,
        #[arg(long, value_name = "FILE")]
        products: PathBuf,
        #[arg(long, value_name = "FILE")]
        sales: PathBuf,
    },
    /// All sales on a date, e.g. 01.01.2020
    Date {
        date: String,
        #[arg(long, value_name = "FILE")]
        sales: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("{} {err}", Color::Red.bold().paint("error:"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            products,
            sales,
            out_dir,
            seed,
        } => generate(products, sales, &out_dir, seed),
        Command::Query { query } => match query {
            QueryCommand::Article {
                code,
                products,
                sales,
            } => query_article(&code, &products, &sales),
            QueryCommand::Date { date, sales } => query_date(&date, &sales),
        },
        Command::Tree { sales } => tree(&sales),
        Command::Stats { products, sales } => stats(&products, &sales),
    }
}

fn load(products: Option<&Path>, sales: Option<&Path>) -> Result<Catalog> {
    let mut catalog = Catalog::new();
    if let Some(path) = products {
        let report = io::import_products(path, &mut catalog)?;
        if report.skipped > 0 {
            eprintln!("{}: skipped {} product line(s)", path.display(), report.skipped);
        }
    }
    if let Some(path) = sales {
        let report = io::import_sales(path, &mut catalog)?;
        if report.skipped > 0 {
            eprintln!("{}: skipped {} sale line(s)", path.display(), report.skipped);
        }
    }
    Ok(catalog)
}

fn generate(products: usize, sales: usize, out_dir: &Path, seed: Option<u64>) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut catalog = Catalog::new();
    let mut duplicates = 0usize;
    for product in gen::generate_products(products, &mut rng) {
        if !catalog.add_product(product) {
            duplicates += 1;
        }
    }
    for sale in gen::generate_sales(sales, &mut rng) {
        catalog.add_sale(sale);
    }

    let products_path = out_dir.join("products.txt");
    let sales_path = out_dir.join("sales.txt");
    io::export_products(&products_path, &catalog)?;
    io::export_sales(&sales_path, &catalog)?;

    println!("seed: {seed}");
    println!(
        "{} products -> {}",
        catalog.product_count(),
        products_path.display()
    );
    if duplicates > 0 {
        println!("({duplicates} duplicate article(s) dropped)");
    }
    println!("{} sales -> {}", catalog.sale_count(), sales_path.display());
    Ok(())
}

fn query_article(code: &str, products: &Path, sales: &Path) -> Result<()> {
    let article: Article = code.parse()?;
    let catalog = load(Some(products), Some(sales))?;
    match catalog.find_by_article(&article) {
        None => println!("article {article} not found"),
        Some(report) => {
            println!("{}", Color::Cyan.bold().paint("product"));
            println!("  {}", report.product);
            println!(
                "{} ({})",
                Color::Cyan.bold().paint("sales"),
                report.sales.len()
            );
            for sale in &report.sales {
                println!("  {sale}");
            }
        }
    }
    Ok(())
}

fn query_date(date: &str, sales: &Path) -> Result<()> {
    let date: Date = date.parse()?;
    let catalog = load(None, Some(sales))?;
    let found = catalog.find_by_date(&date);
    println!(
        "{} ({})",
        Color::Cyan.bold().paint(format!("sales on {date}")),
        found.len()
    );
    for sale in &found {
        println!("  {sale}");
    }
    Ok(())
}

fn tree(sales: &Path) -> Result<()> {
    let catalog = load(None, Some(sales))?;
    print!("{}", catalog.render_date_tree());
    Ok(())
}

fn stats(products: &Path, sales: &Path) -> Result<()> {
    let catalog = load(Some(products), Some(sales))?;
    println!("{}", Color::Cyan.bold().paint("record stores"));
    println!("  products: {}", catalog.product_count());
    println!("  sales:    {}", catalog.sale_count());
    println!("{}", Color::Cyan.bold().paint("article hash index"));
    println!("  capacity: {}", catalog.article_index().capacity());
    println!("  occupied: {}", catalog.article_index().len());
    println!("  load:     {}%", catalog.article_index().load_percent());
    println!("{}", Color::Cyan.bold().paint("ordered indexes"));
    println!(
        "  by article: {} keys / {} refs ({})
  by date:    {} keys / {} refs ({})",
        catalog.sales_by_article().key_count(),
        catalog.sales_by_article().len(),
        validity(catalog.sales_by_article().validate().is_ok()),
        catalog.sales_by_date().key_count(),
        catalog.sales_by_date().len(),
        validity(catalog.sales_by_date().validate().is_ok()),
    );
    Ok(())
}

fn validity(ok: bool) -> String {
    if ok {
        Color::Green.paint("valid").to_string()
    } else {
        Color::Red.paint("INVALID").to_string()
    }
}
