#![deny(warnings)]

//! Headless CLI: load a tender lot, compute its business plan and print the
//! P&L summary.

use anyhow::{bail, Context, Result};
use plan_core::{validate_lot, LotConfig};
use plan_econ::{compute_business_plan, simulate_discounts, BusinessPlan, ReallocationAction};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_LOT: &str = include_str!("../lots/demo.yaml");

#[derive(Debug, Default, PartialEq)]
struct Args {
    lot: Option<String>,
    discount: Option<f64>,
    target: Option<f64>,
    json: bool,
    version: bool,
}

fn parse_pct(flag: &str, value: Option<String>) -> Result<f64> {
    let raw = value.with_context(|| format!("{flag} needs a value"))?;
    raw.parse()
        .with_context(|| format!("{flag}: not a number: {raw}"))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut out = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--lot" => out.lot = Some(it.next().context("--lot needs a path")?),
            "--discount" => out.discount = Some(parse_pct("--discount", it.next())?),
            "--target" => out.target = Some(parse_pct("--target", it.next())?),
            "--json" => out.json = true,
            "--version" | "-V" => out.version = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(out)
}

fn load_lot(path: &Path) -> Result<LotConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading lot file {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    } else {
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

fn demo_lot() -> Result<LotConfig> {
    serde_yaml::from_str(DEMO_LOT).context("parsing built-in demo lot")
}

fn money(v: f64) -> Decimal {
    plan_core::round_money(v)
}

fn print_report(plan: &BusinessPlan) {
    let s = plan.summary();
    println!("Lot: {} | {} months", plan.name, plan.duration_months);
    println!(
        "Cost | team: {} | governance: {} | risk: {} | subcontract: {} | total: {}",
        s.team_cost, s.governance_cost, s.risk_cost, s.subcontract_cost, s.total_cost
    );
    println!(
        "P&L | revenue: {} | margin: {} ({}%) | discount: {}%",
        s.revenue,
        s.margin,
        s.margin_pct,
        money(plan.pnl.discount_pct)
    );
    let target = if plan.margin.target_unreachable {
        "unreachable".to_string()
    } else {
        format!("{}%", s.suggested_discount_pct)
    };
    println!(
        "Discount | for {}% target: {} | break-even: {}%",
        money(plan.margin.effective_target_pct),
        target,
        s.break_even_discount_pct
    );

    for tow in &plan.tows {
        print!(
            "TOW {} | weight {}% | revenue {} | cost {} | margin {}% | {:?} | S/M/J {:.0}/{:.0}/{:.0}%",
            tow.tow_id,
            money(tow.weight_pct),
            money(tow.revenue),
            money(tow.cost),
            money(tow.margin_pct),
            tow.status,
            tow.mix.senior_pct,
            tow.mix.mid_pct,
            tow.mix.junior_pct
        );
        match (tow.unit_revenue, tow.unit_cost) {
            (Some(r), Some(c)) => println!(" | per unit {} / {}", money(r), money(c)),
            _ => println!(),
        }
    }
    for p in &plan.proposals {
        println!(
            "Proposal {} | {:?} | senior {:+.2} FTE | est. saving {}",
            p.tow_id,
            p.kind,
            p.senior_fte_delta,
            money(p.estimated_cost_reduction)
        );
        for a in &p.actions {
            match a {
                ReallocationAction::ReduceSenior { fte, .. } => {
                    println!("  reduce senior by {fte:.2} FTE")
                }
                ReallocationAction::ReplaceWithJunior {
                    profile_id,
                    fte,
                    savings,
                    ..
                } => println!(
                    "  replace {fte:.2} FTE of {profile_id} at junior rate, saving {}",
                    money(*savings)
                ),
                ReallocationAction::MoveExpensive {
                    profile_id,
                    fte,
                    savings,
                    ..
                } => println!(
                    "  move {fte:.2} FTE of {profile_id} to cheaper profiles, saving {}",
                    money(*savings)
                ),
                ReallocationAction::AbsorbSenior { fte_capacity } => {
                    println!("  can absorb {fte_capacity:.2} senior FTE")
                }
                ReallocationAction::ShiftToSenior { fte } => {
                    println!("  shift {fte:.2} FTE from junior to senior")
                }
            }
        }
    }
    for y in &plan.yearly {
        let label = y
            .slice
            .year
            .map(|v| v.to_string())
            .unwrap_or_else(|| format!("Y{}", y.slice.index + 1));
        println!(
            "Year {} | {} months | cost {} (inflated {}) | revenue {} | margin {}",
            label,
            y.slice.months,
            money(y.total_cost),
            money(y.inflated_total_cost),
            money(y.revenue),
            money(y.margin)
        );
    }
    for w in plan.validation.warnings() {
        println!("WARN | {w}");
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!(
            "bidplan {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    info!(lot = ?args.lot, discount = ?args.discount, target = ?args.target, "starting CLI");

    let mut lot = match &args.lot {
        Some(path) => load_lot(Path::new(path))?,
        None => demo_lot()?,
    };
    if let Some(d) = args.discount {
        lot.discount_pct = d;
    }
    if let Some(t) = args.target {
        lot.economics.target_margin_pct = t;
    }
    validate_lot(&lot).context("invalid lot")?;

    let plan = compute_business_plan(&lot);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    print_report(&plan);

    let sweep: Vec<f64> = (0..=4).map(|i| f64::from(i) * 5.0).collect();
    for row in simulate_discounts(plan.costs.total_cost, lot.base_amount, &sweep) {
        println!(
            "Sweep | discount {}% | revenue {} | margin {} ({}%)",
            money(row.discount_pct),
            money(row.revenue),
            money(row.margin),
            money(row.margin_pct)
        );
    }
    Ok(())
}
