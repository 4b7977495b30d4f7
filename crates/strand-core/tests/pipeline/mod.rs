//! 链路行为的集成测试套件。

mod support;

mod faults;
