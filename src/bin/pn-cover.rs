//! 覆盖性分析命令行入口：加载网描述，构造 Karp-Miller 覆盖树，
//! 可选地求加权最优标识并与精确可达图交叉检查.

use anyhow::{Context, Result};
use log::{debug, info};
use rustc_hash::FxHashMap;

use pncover::analysis::coverability::{CoverTreeConfig, CoverabilityTree};
use pncover::analysis::optimizer::{ObjectiveWeights, optimize};
use pncover::analysis::reachability::{StateGraph, StateGraphConfig};
use pncover::analysis::ReachabilityOracle;
use pncover::config::CoverConfig;
use pncover::net::{Net, NetSpec, io};
use pncover::options::Options;
use pncover::report::AnalysisReport;

fn main() -> Result<()> {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let options = Options::parse_from_args(&args).map_err(|err| anyhow::anyhow!("{err}"))?;
    debug!("pn-cover options: {:?}", options);

    let config = CoverConfig::load_from_file(&options.config)?;

    let spec = NetSpec::from_path(&options.net)
        .with_context(|| format!("Failed to load net spec: {}", options.net))?;
    let net = Net::from_spec(&spec)?;
    net.log_diagnostics();
    info!(
        "net loaded: {} 个库所, {} 个迁移",
        net.places_len(),
        net.transitions_len()
    );

    let tree = CoverabilityTree::with_config(
        &net,
        CoverTreeConfig {
            node_limit: config.node_limit,
        },
    );
    info!("coverability tree: {:?}", tree.stats());

    if let Some(path) = &options.dot {
        tree.write_dot(path)
            .with_context(|| format!("Failed to write dot file: {path}"))?;
    }

    let mut report = AnalysisReport::new(&net, &tree);

    let weights = if let Some(path) = &options.weights {
        let spec: FxHashMap<String, i64> = io::read_json(path)
            .with_context(|| format!("Failed to load weights: {path}"))?;
        Some(ObjectiveWeights::from_spec(&net, &spec)?)
    } else if options.random_weights {
        let mut rng = rand::rng();
        Some(ObjectiveWeights::random(
            &net,
            &mut rng,
            config.weight_min..=config.weight_max,
        ))
    } else {
        None
    };

    if let Some(weights) = &weights {
        let outcome = optimize(&tree, weights);
        report = report.with_objective(&net, weights, &outcome);
    }

    if options.exact {
        let exact = StateGraph::with_config(
            &net,
            StateGraphConfig {
                state_limit: config.state_limit,
            },
        );
        info!("exact reachability graph: {:?}", exact.stats());
        report.exact_states = Some(exact.reachable_count());
    }

    print!("{report}");

    if let Some(path) = &options.output {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report: {path}"))?;
        info!("报告已保存至 {path}");
    }

    Ok(())
}
