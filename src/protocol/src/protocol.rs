// Copyright © Roundtable 2026-present

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//    https://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire protocol types. All frames are UTF-8 JSON text with a common
//! envelope: `{ "type": <string>, "payload": <object> }`.

pub mod inbound;
pub mod outbound;
pub mod snapshot;

pub use inbound::InboundFrame;
pub use outbound::OutboundFrame;
pub use snapshot::GameSnapshot;
