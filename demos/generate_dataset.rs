use anyhow::Result;
use synthetic_ledger::*;

fn write_csv<T: serde::Serialize>(rows: &[T], filename: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    println!("📊 Synthetic Ledger Dataset Generator");
    println!("═══════════════════════════════════════════════════════════════\n");

    // 1. Configure the simulated company
    let config = SimulationConfig {
        company_name: "Novak Precision Engineering s.r.o.".to_string(),
        ..SimulationConfig::default()
    };

    println!("🏭 Company:  {}", config.company_name);
    println!("📅 Window:   {} to {}", config.start_date, config.end_date);
    println!("🎲 Seed:     {}", config.seed);
    println!(
        "💰 Targets:  {:.0}% gross margin, {:.0}% EBITDA margin\n",
        config.ratios.gross_margin * 100.0,
        config.ratios.ebitda_margin * 100.0
    );

    // 2. Run the full pipeline
    let outcome = run_simulation(&config)?;

    println!("✅ Generated dataset:");
    println!("   Ledger entries:   {:>8}", outcome.ledger.entries.len());
    println!("   Sales lines:      {:>8}", outcome.ledger.sales.len());
    println!("   Payroll periods:  {:>8}", outcome.ledger.payroll.len());
    println!("   Budget lines:     {:>8}", outcome.budget.len());
    println!("   Chart accounts:   {:>8}", outcome.chart.total_accounts());

    // 3. Annual revenue and profitability
    println!("\n📈 Annual results:");
    println!(
        "   {:<6} {:>16} {:>16} {:>10} {:>10}",
        "Year", "Revenue", "Net income", "GM %", "EBITDA %"
    );
    for (index, year) in outcome.kpis.chunks(12).enumerate() {
        let revenue: f64 = year.iter().map(|k| k.revenue).sum();
        let net_income: f64 = year.iter().map(|k| k.net_income).sum();
        let cogs: f64 = year.iter().map(|k| k.cogs).sum();
        let ebitda: f64 = year.iter().map(|k| k.ebitda).sum();
        println!(
            "   {:<6} {:>16.2} {:>16.2} {:>10.2} {:>10.2}",
            2023 + index,
            revenue,
            net_income,
            (revenue - cogs) / revenue * 100.0,
            ebitda / revenue * 100.0
        );
    }

    // 4. Reconciliation report
    let failures = outcome
        .reconciliation
        .iter()
        .filter(|r| r.status == ReconciliationStatus::Fail)
        .count();
    if failures == 0 {
        println!(
            "\n🔒 Reconciliation: all {} periods balance within {:.0} CZK",
            outcome.reconciliation.len(),
            DEFAULT_TOLERANCE
        );
    } else {
        println!("\n⚠️  Reconciliation: {} periods out of balance", failures);
        for record in outcome.reconciliation.iter().filter(|r| r.status == ReconciliationStatus::Fail) {
            println!("   {} off by {:.2}", record.period, record.difference);
        }
    }

    // 5. Export everything to CSV
    write_csv(&outcome.ledger.entries, "synthetic_ledger.csv")?;
    write_csv(&outcome.ledger.sales, "synthetic_sales.csv")?;
    write_csv(&outcome.ledger.payroll, "synthetic_payroll.csv")?;
    write_csv(&outcome.budget, "synthetic_budget.csv")?;
    write_csv(&outcome.kpis, "synthetic_kpis.csv")?;
    std::fs::write("chart_of_accounts.csv", outcome.chart.to_csv())?;

    println!("\n💾 Exported:");
    println!("   synthetic_ledger.csv");
    println!("   synthetic_sales.csv");
    println!("   synthetic_payroll.csv");
    println!("   synthetic_budget.csv");
    println!("   synthetic_kpis.csv");
    println!("   chart_of_accounts.csv");

    Ok(())
}
