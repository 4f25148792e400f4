use crate::domain::actor::Department;
use crate::domain::request::RequestType;
use crate::errors::DomainError;

/// Produces the ordered department approvals a request type must pass.
pub trait StepSequencer: Send + Sync {
    fn sequence(&self, request_type: RequestType) -> Vec<Department>;

    fn sequence_named(&self, request_type: &str) -> Result<Vec<Department>, DomainError> {
        let request_type = request_type.parse::<RequestType>()?;
        Ok(self.sequence(request_type))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CampusSequencer;

impl StepSequencer for CampusSequencer {
    fn sequence(&self, request_type: RequestType) -> Vec<Department> {
        campus_sequence(request_type).to_vec()
    }
}

pub fn campus_sequence(request_type: RequestType) -> &'static [Department] {
    use Department::{AcademicAffairs, Facilities, Finance, It, StudentAffairs};

    match request_type {
        RequestType::RoomBooking => &[Facilities, It, AcademicAffairs],
        RequestType::EventHosting => &[StudentAffairs, Facilities, It],
        RequestType::EquipmentRequest => &[Finance, AcademicAffairs],
        RequestType::Maintenance => &[Facilities],
    }
}
