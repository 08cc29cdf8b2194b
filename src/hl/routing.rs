use super::{validate::InvalidParameter, ChannelClass, ChannelMask, CpuType, ObjectId};
use crate::configs::CpuAssignment;

/// An inclusive range of object IDs
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ObjIdRange {
    /// First ID of the range
    pub first: ObjectId,
    /// Last ID of the range
    pub last: ObjectId,
}

impl ObjIdRange {
    /// Every object ID
    pub const ALL: ObjIdRange = ObjIdRange::new(ObjectId(0x00), ObjectId(0xFF));

    /// A range from `first` to `last`
    pub const fn new(first: ObjectId, last: ObjectId) -> Self {
        ObjIdRange { first, last }
    }

    /// A range holding a single ID
    pub const fn single(id: ObjectId) -> Self {
        ObjIdRange::new(id, id)
    }

    /// True if `id` is in the range
    pub const fn contains(&self, id: ObjectId) -> bool {
        id.0 >= self.first.0 && id.0 <= self.last.0
    }
}

/// Per-channel assignment table a route looks into
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AssignmentTable {
    /// Rx/Tx channel pairs
    RxTx,
    /// ORx channels
    Orx,
    /// SERDES lanes
    SerdesLane,
}

/// How a matching command is dispatched
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Route {
    /// Always the same CPU, whatever the channel
    Fixed(CpuType),
    /// The CPU assigned to the addressed channel
    PerChannel(AssignmentTable),
    /// No CPU services this combination
    Unrouted,
}

/// One row of the routing table
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RouteRule {
    /// Object IDs this row applies to
    pub objects: ObjIdRange,
    /// Channel class this row applies to, `None` for any class
    pub class: Option<ChannelClass>,
    /// Resulting dispatch
    pub route: Route,
}

const fn rule(objects: ObjIdRange, class: Option<ChannelClass>, route: Route) -> RouteRule {
    RouteRule {
        objects,
        class,
        route,
    }
}

/// Object ID and channel class to CPU routing table
///
/// Rows are matched in order, the first match wins. A command that matches
/// no row has no CPU to go to.
pub const ROUTING_TABLE: &[RouteRule] = &[
    rule(
        ObjIdRange::single(ObjectId::IC_RC_TUNER),
        None,
        Route::Fixed(CpuType::Cpu0),
    ),
    rule(
        ObjIdRange::single(ObjectId::IC_ORX_ADC),
        Some(ChannelClass::Orx),
        Route::PerChannel(AssignmentTable::Orx),
    ),
    rule(
        ObjIdRange::single(ObjectId::TC_ORX_ADC),
        Some(ChannelClass::Orx),
        Route::PerChannel(AssignmentTable::Orx),
    ),
    rule(
        ObjIdRange::single(ObjectId::IC_SERDES),
        Some(ChannelClass::SerdesLane),
        Route::PerChannel(AssignmentTable::SerdesLane),
    ),
    rule(
        ObjIdRange::single(ObjectId::TC_SERDES),
        Some(ChannelClass::SerdesLane),
        Route::PerChannel(AssignmentTable::SerdesLane),
    ),
    rule(ObjIdRange::single(ObjectId::IC_ORX_ADC), None, Route::Unrouted),
    rule(ObjIdRange::single(ObjectId::TC_ORX_ADC), None, Route::Unrouted),
    rule(ObjIdRange::single(ObjectId::IC_SERDES), None, Route::Unrouted),
    rule(ObjIdRange::single(ObjectId::TC_SERDES), None, Route::Unrouted),
    rule(
        ObjIdRange::ALL,
        Some(ChannelClass::Rx),
        Route::PerChannel(AssignmentTable::RxTx),
    ),
    rule(
        ObjIdRange::ALL,
        Some(ChannelClass::Tx),
        Route::PerChannel(AssignmentTable::RxTx),
    ),
];

/// Resolves the CPU that services `channel` for object `obj_id`
///
/// `channel` must select exactly one channel. Fails if it does not, or if no
/// row of `table` matches.
pub fn route(
    table: &[RouteRule],
    assignment: &CpuAssignment,
    obj_id: ObjectId,
    channel: ChannelMask,
) -> Result<CpuType, InvalidParameter> {
    let index = channel.single()? as usize;

    let rule = table
        .iter()
        .find(|rule| {
            rule.objects.contains(obj_id)
                && rule.class.map_or(true, |class| class == channel.class())
        })
        .ok_or(InvalidParameter("channel"))?;

    let cpus: &[CpuType] = match rule.route {
        Route::Fixed(cpu) => return Ok(cpu),
        Route::Unrouted => return Err(InvalidParameter("channel")),
        Route::PerChannel(AssignmentTable::RxTx) => &assignment.rx_tx,
        Route::PerChannel(AssignmentTable::Orx) => &assignment.orx,
        Route::PerChannel(AssignmentTable::SerdesLane) => &assignment.serdes_lane,
    };

    cpus.get(index).copied().ok_or(InvalidParameter("channel"))
}

/// Packed mask (see [`ChannelMask::packed`]) of the Rx, ORx and Tx channels
/// whose commands for `obj_id` go to `cpu`
pub fn serviced_channels(
    table: &[RouteRule],
    assignment: &CpuAssignment,
    obj_id: ObjectId,
    cpu: CpuType,
) -> u32 {
    [ChannelMask::rx(0xff), ChannelMask::orx(0x03), ChannelMask::tx(0xff)]
        .into_iter()
        .flat_map(|mask| mask.channels())
        .filter(|channel| route(table, assignment, obj_id, *channel) == Ok(cpu))
        .fold(0, |packed, channel| packed | channel.packed())
}
