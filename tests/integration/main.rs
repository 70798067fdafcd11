// guard-console 통합 테스트

mod test_cli;
mod test_registry_flow;
mod test_state_sync;
