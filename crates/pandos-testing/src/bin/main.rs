//! Runs the named simulation scenarios and reports pass/fail, the way
//! the reference implementation's `testers/*.c` programs were run one
//! at a time against the real UMPS3 emulator.

use anyhow::Result;
use pandos_testing::simulation;

fn main() -> Result<()> {
    env_logger::init();

    log::info!("running ackermann scenario");
    let ackermann = simulation::run_ackermann_scenario()?;
    println!("ackermann(2, 3) = {ackermann}");

    log::info!("running hanoi scenario");
    let hanoi = simulation::run_hanoi_scenario()?;
    println!("hanoi(5) = {hanoi}");

    log::info!("running swap stress scenario");
    simulation::run_swap_stress_scenario()?;
    println!("swap stress: ok");

    log::info!("running deadlock scenario");
    simulation::run_deadlock_scenario()?;
    println!("deadlock detection: ok");

    log::info!("running clean shutdown scenario");
    simulation::run_clean_shutdown_scenario()?;
    println!("clean shutdown: ok");

    log::info!("running pseudo-clock broadcast scenario");
    let woken = simulation::run_pseudo_clock_broadcast_scenario()?;
    println!("pseudo-clock broadcast: woke {} waiters in order", woken.len());

    Ok(())
}
