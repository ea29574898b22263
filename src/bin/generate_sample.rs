use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde_json::json;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

const CITIES: &[&str] = &[
    "sao paulo", "rio de janeiro", "belo horizonte", "brasilia", "curitiba",
    "campinas", "porto alegre", "salvador", "guarulhos", "niteroi", "recife",
];
const CATEGORIES: &[&str] = &[
    "cama_mesa_banho", "beleza_saude", "esporte_lazer", "informatica_acessorios",
    "moveis_decoracao", "utilidades_domesticas", "relogios_presentes", "brinquedos",
];
const PAYMENTS: &[&str] = &["credit_card", "boleto", "voucher", "debit_card"];

const N_ORDERS: usize = 400;

#[derive(Parser, Debug)]
#[command(about = "Write a deterministic multi-file sample sales dataset")]
struct Args {
    /// Directory to write the sample files into
    #[arg(default_value = "data")]
    out_dir: PathBuf,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn main() -> Result<()> {
    let out_dir = Args::parse().out_dir;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let order_ids: Vec<String> = (0..N_ORDERS).map(|i| format!("o{i:05}")).collect();

    // ---- orders.csv: one row per order, some cities missing ----
    let orders_path = out_dir.join("orders.csv");
    let mut writer = csv::Writer::from_path(&orders_path).context("creating orders.csv")?;
    writer.write_record(["order_id", "customer_city", "order_purchase_timestamp"])?;
    for id in &order_ids {
        let city = if rng.chance(0.03) { "" } else { rng.pick(CITIES) };
        let timestamp = format!(
            "2018-{:02}-{:02} {:02}:{:02}:{:02}",
            1 + rng.below(8),
            1 + rng.below(28),
            rng.below(24),
            rng.below(60),
            rng.below(60)
        );
        writer.write_record([id.as_str(), city, timestamp.as_str()])?;
    }
    writer.flush()?;

    // ---- order_items.json: 1-3 items per order, outliers and duplicates ----
    let mut items = Vec::new();
    for id in &order_ids {
        let n_items = 1 + rng.below(3);
        let category = rng.pick(CATEGORIES);
        for item in 1..=n_items {
            let mut price = round2(rng.range(15.0, 180.0));
            if rng.chance(0.02) {
                price *= 40.0;
            }
            let record = json!({
                "order_id": id,
                "order_item_id": item,
                "product_category_name": category,
                "price": if rng.chance(0.04) { None } else { Some(price) },
                "freight_value": round2(rng.range(7.0, 30.0)),
                "product_description_lenght": 150 + rng.below(1500),
                "product_weight_g": 100 + rng.below(4000),
                "product_length_cm": 16 + rng.below(40),
                "product_height_cm": 2 + rng.below(30),
                "product_width_cm": 11 + rng.below(30),
            });
            if rng.chance(0.03) {
                items.push(record.clone());
            }
            items.push(record);
        }
    }
    let items_path = out_dir.join("order_items.json");
    std::fs::write(&items_path, serde_json::to_string_pretty(&items)?)
        .context("writing order_items.json")?;

    // ---- payments.parquet: one payment per order ----
    let mut payment_types = Vec::with_capacity(N_ORDERS);
    let mut payment_values = Vec::with_capacity(N_ORDERS);
    for _ in &order_ids {
        payment_types.push(rng.pick(PAYMENTS));
        payment_values.push(round2(rng.range(20.0, 400.0)));
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Utf8, false),
        Field::new("payment_type", DataType::Utf8, false),
        Field::new("payment_value", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                order_ids.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(payment_types)),
            Arc::new(Float64Array::from(payment_values)),
        ],
    )
    .context("building payments batch")?;

    let payments_path = out_dir.join("payments.parquet");
    let file = std::fs::File::create(&payments_path).context("creating payments.parquet")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing payments batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote {N_ORDERS} orders, {} item rows, and {N_ORDERS} payments to {}",
        items.len(),
        out_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_dir_defaults_to_data() {
        let args = Args::try_parse_from(["generate_sample"]).unwrap();
        assert_eq!(args.out_dir, PathBuf::from("data"));
    }

    #[test]
    fn out_dir_is_positional() {
        let args = Args::try_parse_from(["generate_sample", "/tmp/sales"]).unwrap();
        assert_eq!(args.out_dir, PathBuf::from("/tmp/sales"));
        assert!(Args::try_parse_from(["generate_sample", "a", "b"]).is_err());
    }
}
