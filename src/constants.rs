// Copyright 2025
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// The HighwayHash key used for all hashing in the format.
/// This is 'Riegeli/', 'records\n', 'Riegeli/', 'records\n' in 64-bit chunks,
/// a wire-format constant shared by every implementation.
pub const HIGHWAY_HASH_KEY: [u64; 4] = [
    0x2f696c6567656952,
    0x0a7364726f636572,
    0x2f696c6567656952,
    0x0a7364726f636572,
];

/// Largest representable stream position. Positions are kept below `2^63` so
/// they always convert to the signed offsets used by seek system calls.
pub const MAX_POSITION: u64 = i64::MAX as u64;
