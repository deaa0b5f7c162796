/*
 *  Copyright 2026 Sluice Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

// Entry point for the `integration` test binary. Cargo only builds a
// `tests/<dir>/` tree into a target via its `main.rs`, so every scenario
// module has to be declared here to actually run.

mod happy_path;
mod loader_failure;
mod pagination;
mod partial_failure;
mod restart_resume;
mod rpc_roundtrip;
