#![cfg_attr(test, allow(unused_crate_dependencies))]

use std::sync::Arc;

use clap::crate_version;
use graphql_operation_tracing::{CollectingSink, RequestTracer};

mod args;
mod report;
mod request;
mod simulate;
mod telemetry;

fn main() -> anyhow::Result<()> {
    let args = self::args::parse();
    telemetry::init(&args);

    let crate_version = crate_version!();
    tracing::debug!("gqlname {crate_version}");

    let config = Arc::new(args.config()?);
    let request = args.request()?;

    let mut sink = CollectingSink::default();
    let mut tracer = RequestTracer::new(config, &mut sink);
    simulate::run(&mut tracer, &request);
    tracer.finish();

    let report = report::Report::new(sink)?;
    print!("{}", report.render(args.output)?);

    Ok(())
}
