use std::fs;

use itertools::iproduct;
use prodplan::{
    config::{Counts, Scalars},
    models::planning::{Parameters, PlanningModel, PlanningResult, Sets},
    parse::ParseTableError,
    problem::ProblemConstructionError,
    report::Report,
    Config, Problem,
};

const EPS: f64 = 1e-6;

fn config() -> Config {
    Config {
        counts: Counts {
            raw_materials: 2,
            semi_products: 2,
            final_products: 2,
            periods: 3,
        },
        parameters: Scalars {
            production_cost_semi: 1.0,
            production_cost_final: 1.0,
            setup_cost_semi: 5.0,
            setup_cost_final: 5.0,
            inventory_cost_raw: 1.0,
            inventory_cost_semi: 1.0,
            inventory_cost_final: 1.0,
            inventory_capacity_raw: 500.0,
            inventory_capacity_semi: 500.0,
            inventory_capacity_final: 500.0,
            production_capacity_semi: 100.0,
            production_capacity_final: 40.0,
            setup_limit_semi: 2.0,
            setup_limit_final: 1.0,
            lot_size: 5.0,
            sell_buy_ratio: 0.25,
            big_m: 1e9,
        },
        ..Config::default()
    }
}

fn write_tables(dir: &std::path::Path, config: &Config) {
    let files = &config.files;
    fs::write(dir.join(&files.demand), "product,1,2,3\nA,10,25,10\nB,15,5,20\n").unwrap();
    fs::write(dir.join(&files.bom_semi), "semi,R1,R2\nS1,1,0\nS2,1,2\n").unwrap();
    fs::write(dir.join(&files.bom_final), "product,S1,S2\nA,1,0\nB,1,1\n").unwrap();
    fs::write(dir.join(&files.raw_price), "material,1,2,3\nR1,1,1,2\nR2,2,1,1\n").unwrap();
    fs::write(dir.join(&files.final_price), "product,1,2,3\nA,100,100,100\nB,120,110,100\n").unwrap();
    fs::write(dir.join(&files.semi_price), "semi,1,2,3\nS1,8,8,8\nS2,12,12,12\n").unwrap();
}

fn solve(problem: &Problem) -> (Sets, Parameters, PlanningResult) {
    let sets = Sets::new(problem);
    let parameters = Parameters::new(problem);
    let result = PlanningModel::build(&sets, &parameters).solve().unwrap();
    (sets, parameters, result)
}

#[test]
fn optimal_plan_respects_every_constraint() {
    let dir = tempfile::tempdir().unwrap();
    let config = config();
    write_tables(dir.path(), &config);

    let problem = Problem::load(dir.path(), &config).unwrap();
    let (sets, p, r) = solve(&problem);
    let periods = sets.T.len();

    for t in 0..periods {
        // capacities
        assert!(r.PF.iter().map(|row| row[t]).sum::<f64>() <= p.PFCap + EPS);
        assert!(r.PS.iter().map(|row| row[t]).sum::<f64>() <= p.PSCap + EPS);
        assert!(r.IF.iter().map(|row| row[t]).sum::<f64>() <= p.IFCap + EPS);
        assert!(r.IS.iter().map(|row| row[t]).sum::<f64>() <= p.ISCap + EPS);
        assert!(r.IR.iter().map(|row| row[t]).sum::<f64>() <= p.IRCap + EPS);

        // setup limits and gating
        assert!(r.PFS.iter().map(|row| row[t]).sum::<f64>() <= p.PFSL + EPS);
        assert!(r.PSS.iter().map(|row| row[t]).sum::<f64>() <= p.PSSL + EPS);
        for (pf, setup) in r.PF.iter().zip(&r.PFS) {
            assert!(pf[t] <= EPS || setup[t] > 1.0 - EPS);
        }
        for (ps, setup) in r.PS.iter().zip(&r.PSS) {
            assert!(ps[t] <= EPS || setup[t] > 1.0 - EPS);
        }

        // whole lots
        for (sr, ksr) in r.SR.iter().zip(&r.KSR) {
            assert!((sr[t] - p.LSR * ksr[t]).abs() < EPS);
            assert!((ksr[t] - ksr[t].round()).abs() < EPS);
        }
    }

    // balances
    for (i, &fi) in sets.I.iter().enumerate() {
        for (t, &ft) in sets.T.iter().enumerate() {
            assert!(r.BF[i][t] <= p.D[fi][ft] + EPS);
            let carried = if t == 0 { 0.0 } else { r.IF[i][t - 1] };
            let lhs = carried + r.PF[i][t] - r.IF[i][t] + r.BF[i][t];
            assert!((lhs - p.D[fi][ft]).abs() < EPS);
        }
    }
    for (j, &sj) in sets.J.iter().enumerate() {
        for (t, _) in sets.T.iter().enumerate() {
            let used: f64 = sets
                .I
                .iter()
                .enumerate()
                .map(|(i, &fi)| p.BOMF[fi][sj] * r.PF[i][t])
                .sum();
            let carried = if t == 0 { 0.0 } else { r.IS[j][t - 1] };
            let available = carried + r.PS[j][t] - r.IS[j][t] + r.OSC[j][t] - r.SSC[j][t];
            assert!((used - available).abs() < EPS);
        }
    }
    for (k, &rk) in sets.K.iter().enumerate() {
        for (t, _) in sets.T.iter().enumerate() {
            let used: f64 = sets
                .J
                .iter()
                .enumerate()
                .map(|(j, &sj)| p.BOMS[sj][rk] * r.PS[j][t])
                .sum();
            let carried = if t == 0 { 0.0 } else { r.IR[k][t - 1] };
            assert!((used - (carried + r.SR[k][t] - r.IR[k][t])).abs() < EPS);
        }
    }

    assert!((r.TC - (r.CIR + r.CIS + r.CIF + r.CSR + r.CPS + r.CPF)).abs() < EPS);

    let final_sales: f64 = iproduct!(sets.I.iter().enumerate(), sets.T.iter().enumerate())
        .map(|((i, &fi), (t, &ft))| (p.D[fi][ft] - r.BF[i][t]) * p.MPF[fi][ft])
        .sum();
    let semi_sales: f64 = iproduct!(sets.J.iter().enumerate(), sets.T.iter().enumerate())
        .map(|((j, &sj), (t, &st))| p.SBR * p.MPS[sj][st] * r.SSC[j][t])
        .sum();
    assert!((r.TR - (final_sales + semi_sales)).abs() < 1e-3);
    assert!(r.objective > 0.0);
}

#[test]
fn report_lists_every_entity() {
    let dir = tempfile::tempdir().unwrap();
    let config = config();
    write_tables(dir.path(), &config);

    let problem = Problem::load(dir.path(), &config).unwrap();
    let (_, _, result) = solve(&problem);
    let text = Report::new(&problem, &result).to_string();

    let objective = text.lines().next().unwrap().parse::<f64>().unwrap();
    assert!((objective - result.objective).abs() < 1e-6);
    assert_eq!(text.lines().filter(|l| l.starts_with("---")).count(), 8);
    for label in ["a", "b", "s1", "s2", "r1", "r2"] {
        assert!(text.lines().any(|l| l.starts_with(&format!("{label} & "))));
    }
    // label plus one value per period
    assert!(text
        .lines()
        .filter(|l| l.ends_with("\\\\"))
        .all(|l| l.matches(" & ").count() == 3));
}

#[test]
fn a_short_table_aborts_before_building() {
    let dir = tempfile::tempdir().unwrap();
    let config = config();
    write_tables(dir.path(), &config);
    fs::write(dir.path().join(&config.files.raw_price), "material,1,2,3\nR1,1,1,2\n").unwrap();

    let err = Problem::load(dir.path(), &config).unwrap_err();
    assert!(matches!(
        err,
        ProblemConstructionError::Table {
            source: ParseTableError::DimensionMismatch { .. },
            ..
        }
    ));
}

#[test]
fn default_configuration_reads_the_bundled_data() {
    let config = Config::default();
    let problem = Problem::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data"), &config).unwrap();
    assert_eq!(problem.periods().len(), config.counts.periods);
    assert_eq!(problem.finals().len(), config.counts.final_products);
    assert_eq!(problem.semis().len(), config.counts.semi_products);
    assert_eq!(problem.raws().len(), config.counts.raw_materials);
}
