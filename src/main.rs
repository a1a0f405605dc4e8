use std::process::ExitCode;

use tracesim::execution_stats::RunTimer;
use tracesim::population::ContextPopulationExt;
use tracesim::runner::{run_with_args, setup_simulation};
use tracesim::tracing_manager::ContextTracingExt;

fn main() -> ExitCode {
    let timer = RunTimer::start();
    match run_with_args(setup_simulation) {
        Ok(context) => {
            let messages_sent = context
                .message_dispatcher()
                .sent_messages_by_day()
                .values()
                .sum();
            timer
                .finish(
                    context.get_population_size(),
                    context.get_current_time(),
                    messages_sent,
                )
                .print();
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("tracesim: {error}");
            ExitCode::FAILURE
        }
    }
}
