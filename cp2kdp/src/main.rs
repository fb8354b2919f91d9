use shared::{
    Result,
    info,
};

use cp2kdp::cli::run;

fn main() -> Result<()> {
    let now = std::time::Instant::now();

    run()?;

    info!("Time used: {:?}", now.elapsed());
    Ok(())
}
