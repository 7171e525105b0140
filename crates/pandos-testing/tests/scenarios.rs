//! End-to-end scenario coverage, one test per named reference test
//! program plus the two whole-machine termination conditions.

use pandos_testing::simulation;
use std::io::Write;

#[test]
fn ackermann_two_three_is_nine() {
    let result = simulation::run_ackermann_scenario().expect("ackermann scenario");
    assert_eq!(result, 9);
}

#[test]
fn hanoi_five_disks_is_thirty_one_moves() {
    let result = simulation::run_hanoi_scenario().expect("hanoi scenario");
    assert_eq!(result, 31);
}

#[test]
fn swap_pool_survives_a_stress_pass_across_vpns_20_to_29() {
    simulation::run_swap_stress_scenario().expect("swap stress scenario");
}

#[test]
fn two_processes_waiting_on_each_others_semaphore_is_a_deadlock() {
    simulation::run_deadlock_scenario().expect("deadlock scenario");
}

#[test]
fn all_processes_terminating_is_a_clean_shutdown() {
    simulation::run_clean_shutdown_scenario().expect("clean shutdown scenario");
}

#[test]
fn pseudo_clock_tick_wakes_three_waiters_in_fifo_order() {
    let woken = simulation::run_pseudo_clock_broadcast_scenario().expect("pseudo clock scenario");
    assert_eq!(woken.len(), 3);
}

#[test]
fn scenario_summary_can_be_snapshotted_to_disk() {
    let ackermann = simulation::run_ackermann_scenario().expect("ackermann scenario");
    let hanoi = simulation::run_hanoi_scenario().expect("hanoi scenario");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("scenario-summary.txt");
    let mut f = std::fs::File::create(&path).expect("create summary file");
    writeln!(f, "ackermann(2,3)={ackermann}").unwrap();
    writeln!(f, "hanoi(5)={hanoi}").unwrap();
    drop(f);

    let contents = std::fs::read_to_string(&path).expect("read summary file");
    assert!(contents.contains("ackermann(2,3)=9"));
    assert!(contents.contains("hanoi(5)=31"));
}
