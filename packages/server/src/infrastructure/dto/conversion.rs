//! Conversion from inbound DTOs to domain requests.

use crate::domain::CreateRoom;
use crate::infrastructure::dto::websocket::CreateRoomRequest;

impl From<CreateRoomRequest> for CreateRoom {
    fn from(dto: CreateRoomRequest) -> Self {
        Self {
            name: dto.name,
            max_users: dto.max_users,
            password: dto.password.filter(|password| !password.is_empty()),
        }
    }
}
