use anyhow::Result;
use std::collections::BTreeMap;
use synthetic_ledger::*;

fn main() -> Result<()> {
    println!("📊 Dashboard Feed Export");
    println!("═══════════════════════════════════════════════════════════════\n");

    // 1. Generate a verified dataset
    let config = SimulationConfig::default();
    let outcome = run_simulation_with_verification(&config, DEFAULT_TOLERANCE)?;
    println!(
        "✅ {} months generated and reconciled for {}\n",
        outcome.kpis.len(),
        config.company_name
    );

    // 2. Headline KPIs for the latest month
    let latest = outcome.kpis.last().unwrap();
    println!("📌 Latest period: {}", latest.period);
    println!("   Revenue:        {:>16.2}", latest.revenue);
    println!("   EBITDA:         {:>16.2} ({:.1}%)", latest.ebitda, latest.ebitda_margin_pct);
    println!("   Net income:     {:>16.2}", latest.net_income);
    println!("   Net cash flow:  {:>16.2}", latest.net_cashflow);
    println!("   DSO / DPO:      {:>9.1} / {:.1} days", latest.dso_days, latest.dpo_days);

    // 3. Operating expenses by category for the latest month
    let mut by_category: BTreeMap<OpexCategory, (f64, f64)> = BTreeMap::new();
    for row in outcome
        .dashboard
        .opex_breakdown
        .iter()
        .filter(|r| r.period == latest.period)
    {
        let slot = by_category.entry(row.category).or_insert((0.0, 0.0));
        slot.0 += row.planned;
        slot.1 += row.actual;
    }
    println!("\n💸 Opex budget vs actual ({}):", latest.period);
    println!("   {:<22} {:>14} {:>14}", "Category", "Planned", "Actual");
    for (category, (planned, actual)) in &by_category {
        println!("   {:<22} {:>14.2} {:>14.2}", format!("{:?}", category), planned, actual);
    }

    // 4. Capex and personnel trajectory
    let capex = outcome.dashboard.capex.last().unwrap();
    println!("\n🏗️  Capex ({}):", capex.period);
    println!("   Invested this month:       {:>14.2}", capex.investment);
    println!("   Accumulated depreciation:  {:>14.2}", capex.accumulated_depreciation);

    let personnel = outcome.dashboard.personnel.last().unwrap();
    println!("\n👥 Personnel ({}):", personnel.period);
    println!("   Total cost:        {:>14.2}", personnel.total_cost);
    println!("   Share of revenue:  {:>13.2}%", personnel.share_of_revenue_pct);

    // 5. Sales channel mix across the final year
    let final_year = &latest.period[..4];
    let mut channel_revenue: BTreeMap<String, f64> = BTreeMap::new();
    for row in outcome
        .dashboard
        .sales_channels
        .iter()
        .filter(|r| r.period.starts_with(final_year))
    {
        *channel_revenue.entry(format!("{:?}", row.channel)).or_default() += row.net_revenue;
    }
    let total: f64 = channel_revenue.values().sum();
    println!("\n🛒 Sales channels ({}):", final_year);
    for (channel, revenue) in &channel_revenue {
        println!("   {:<12} {:>16.2} ({:>5.1}%)", channel, revenue, revenue / total * 100.0);
    }

    // 6. Write the bundle a BI frontend would consume
    std::fs::write("dashboard_feed.json", outcome.dashboard.to_json()?)?;
    println!("\n💾 Exported: dashboard_feed.json");

    Ok(())
}
