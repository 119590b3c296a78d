// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::time::Instant;

use anyhow::Context;
use dagwood_flow::config::{load_and_validate_config, KernelConfig, RuntimeBuilder};
use dagwood_flow::outputs::Promise;
use dagwood_flow::ports::{Inlet, PermitInlet, PermitPort, StreamPort};
use dagwood_flow::traits::{Action, Flow};
use tracing_subscriber::EnvFilter;

/// Items in flight between the producer and the consumer
const CREDITS: i64 = 4;
const DEFAULT_COUNT: u64 = 100;

fn init_tracing(cfg: &KernelConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Producer: squares `1..=count`, one per credit.
struct Squares {
    credits: PermitPort,
    sink: Inlet<u64>,
    next: u64,
    count: u64,
}

impl Action for Squares {
    fn run(&mut self) -> anyhow::Result<Flow> {
        self.credits.acquire(1)?;
        self.sink.post(self.next * self.next)?;
        if self.next == self.count {
            self.sink.close()?;
            return Ok(Flow::Stop);
        }
        self.next += 1;
        Ok(Flow::Continue)
    }
}

/// Consumer: sums the stream and hands a credit back per item.
struct Sum {
    values: StreamPort<u64>,
    credits: PermitInlet,
    total: u64,
    result: Promise<u64>,
}

impl Action for Sum {
    fn run(&mut self) -> anyhow::Result<Flow> {
        match self.values.consume()? {
            Some(value) => {
                self.total += value;
                self.credits.release(1)?;
                Ok(Flow::Continue)
            }
            None => {
                self.result.complete(self.total)?;
                Ok(Flow::Stop)
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: {} [config.(yaml|toml|json)] [count]", args[0]);
        eprintln!("Example: {} configs/thread-pool.yaml 1000", args[0]);
        return Ok(());
    }

    let config_path = args.get(1).filter(|a| a.parse::<u64>().is_err());
    let count = args
        .iter()
        .skip(1)
        .find_map(|a| a.parse::<u64>().ok())
        .unwrap_or(DEFAULT_COUNT)
        .max(1);

    let cfg = match config_path {
        Some(path) => load_and_validate_config(path)
            .with_context(|| format!("loading {path}"))?,
        None => KernelConfig::default(),
    };
    init_tracing(&cfg);

    let dataflow = RuntimeBuilder::from_config(&cfg)?;
    println!(
        "Summing squares of 1..={} on the {} executor ({} credits in flight)",
        count,
        dataflow.executor().name(),
        CREDITS
    );

    let started = Instant::now();
    let producer = dataflow.actor("squares");
    let credits = producer.permit("credits", CREDITS);

    let consumer = dataflow.actor("sum");
    let values = consumer.primary_stream::<u64>("values", Some(CREDITS as usize));
    let sink = values.inlet();
    let result = consumer.promise::<u64>("total");

    consumer.build(Sum {
        values,
        credits: credits.inlet(),
        total: 0,
        result: result.clone(),
    });
    producer.build(Squares {
        credits,
        sink,
        next: 1,
        count,
    });

    let total = result.get().await?;
    dataflow.completion().get().await?;

    let expected = count * (count + 1) * (2 * count + 1) / 6;
    println!("Result: {total} (expected {expected}) in {:?}", started.elapsed());
    anyhow::ensure!(total == expected, "pipeline produced {total}, expected {expected}");
    Ok(())
}
