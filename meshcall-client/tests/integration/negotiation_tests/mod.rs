pub mod test_configuration_failure_isolates_peer;
pub mod test_invalid_signals_are_dropped;
pub mod test_offer_yields_single_answer;
