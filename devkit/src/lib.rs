/*!
# fastwatch DevKit - stubs and utilities for development

Makes coordinator and sensor tests possible without a router:
- Mock `DeviceApi` client with scripted answers, failures and delays
- Host fixtures shaped like the router's host table
- Test harness with a manual clock
*/

pub mod device_stub;
pub mod test_utils;

pub use device_stub::{DeviceCall, HostFixture, MockDeviceClient, Step};
pub use test_utils::{ManualClock, TestHarness, START_TIME};
