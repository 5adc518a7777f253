//! Test doubles for the host and for hooked game objects

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use ncz_engine::{ConVarHandle, EdictRef, EntityPtr, GameIdentity, GameTick, Host};
use ncz_sdk::{ConVar, Edict, HostBuild, IMoveHelper, Vector};
use parking_lot::Mutex;

use crate::gamedata::{slots, IniDocument, SlotTable, TargetIdentity};
use crate::hooks::abi;
use crate::players::{EntityIndex, PlayerTable, SlotStatus};

/// Serializes tests that attach dispatchers to the process-wide cells
pub(crate) static TRAMPOLINE_LOCK: Mutex<()> = parking_lot::const_mutex(());

struct FakeConVar {
    name: String,
    handle: ConVarHandle,
    value: bool,
}

struct FakeEdict {
    edict: EdictRef,
    entity: usize,
    valid: bool,
}

/// In-memory [`Host`]
pub(crate) struct FakeHost {
    identity: GameIdentity,
    game_dir: PathBuf,
    tick: AtomicI32,
    tick_interval: Mutex<f32>,
    convars: Mutex<Vec<FakeConVar>>,
    edicts: Mutex<Vec<FakeEdict>>,
}

impl FakeHost {
    pub fn new(game: &str) -> Self {
        Self::with_build(game, HostBuild::Generic)
    }

    pub fn with_build(game: &str, build: HostBuild) -> Self {
        Self {
            identity: GameIdentity::new(game, build),
            game_dir: PathBuf::from(game),
            tick: AtomicI32::new(0),
            tick_interval: Mutex::new(0.015),
            convars: Mutex::new(Vec::new()),
            edicts: Mutex::new(Vec::new()),
        }
    }

    pub fn set_game_dir(&mut self, dir: &Path) {
        self.game_dir = dir.to_path_buf();
    }

    pub fn set_tick(&self, tick: i32) {
        self.tick.store(tick, Ordering::Relaxed);
    }

    pub fn set_tick_interval(&self, interval: f32) {
        *self.tick_interval.lock() = interval;
    }

    /// Create or update a boolean convar
    pub fn set_convar(&self, name: &str, value: bool) {
        let mut convars = self.convars.lock();
        if let Some(convar) = convars.iter_mut().find(|c| c.name == name) {
            convar.value = value;
            return;
        }
        let ptr = Box::into_raw(Box::new(0u64)) as *mut ConVar;
        convars.push(FakeConVar {
            name: name.to_string(),
            handle: ConVarHandle::from_ptr(ptr).unwrap(),
            value,
        });
    }

    /// Give `entity` a valid edict
    pub fn add_entity(&self, entity: *mut c_void) -> EdictRef {
        let edict = EdictRef::from_ptr(Box::into_raw(Box::new(0u64)) as *mut Edict).unwrap();
        self.edicts.lock().push(FakeEdict {
            edict,
            entity: entity as usize,
            valid: true,
        });
        edict
    }

    pub fn invalidate(&self, edict: EdictRef) {
        if let Some(entry) = self.edicts.lock().iter_mut().find(|e| e.edict == edict) {
            entry.valid = false;
        }
    }
}

impl Host for FakeHost {
    fn identity(&self) -> &GameIdentity {
        &self.identity
    }

    fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    fn tick_count(&self) -> GameTick {
        GameTick(self.tick.load(Ordering::Relaxed))
    }

    fn tick_interval(&self) -> f32 {
        *self.tick_interval.lock()
    }

    fn find_convar(&self, name: &str) -> Option<ConVarHandle> {
        self.convars
            .lock()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.handle)
    }

    fn convar_bool(&self, convar: ConVarHandle) -> bool {
        self.convars
            .lock()
            .iter()
            .find(|c| c.handle == convar)
            .is_some_and(|c| c.value)
    }

    fn is_valid_edict(&self, edict: EdictRef) -> bool {
        self.edicts
            .lock()
            .iter()
            .any(|e| e.edict == edict && e.valid)
    }

    fn edict_to_entity(&self, edict: EdictRef) -> Option<EntityPtr> {
        self.edicts
            .lock()
            .iter()
            .find(|e| e.edict == edict)
            .and_then(|e| EntityPtr::from_ptr(e.entity as *mut c_void))
    }

    fn entity_to_edict(&self, entity: *mut c_void) -> Option<EdictRef> {
        if entity.is_null() {
            return None;
        }
        self.edicts
            .lock()
            .iter()
            .find(|e| e.entity == entity as usize)
            .map(|e| e.edict)
    }
}

pub(crate) const WEAPON_EQUIP_SLOT: usize = 1;
pub(crate) const WEAPON_DROP_SLOT: usize = 2;
pub(crate) const GROUND_ENTITY_SLOT: usize = 3;
pub(crate) const RUN_COMMAND_SLOT: usize = 4;
const VTABLE_LEN: usize = 8;

/// config.ini content for the `test` game, valid on every platform
pub(crate) fn config_ini(disable_systems: &str) -> String {
    let slot_values = [
        (slots::GET_DATADESC_MAP, 5),
        (slots::SET_TRANSMIT, 6),
        (slots::GROUND_ENTITY, GROUND_ENTITY_SLOT),
        (slots::WEAPON_EQUIP, WEAPON_EQUIP_SLOT),
        (slots::WEAPON_DROP, WEAPON_DROP_SLOT),
        (slots::PLAYER_RUN_COMMAND, RUN_COMMAND_SLOT),
        (slots::DISPATCH, 7),
        (slots::THINK_POST, 0),
    ];

    let mut ini = String::from("[CONFIG]\nconfig_version=1\n\n[test]\n");
    for (name, index) in slot_values {
        ini.push_str(&format!("{name}_linux={index}\n{name}_windows={index}\n"));
    }
    ini.push_str(
        "playerdataclass=DT_TestPlayer\n\
         f_smoketime=17.5\n\
         f_smoke_time_to_bang=1.0\n\
         f_inner_smoke_radius_sqr=5184.0\n\
         f_smoke_radius=144.0\n",
    );
    ini.push_str(&format!("disable_systems={disable_systems}\n"));
    ini
}

/// Fake player class: a vtable whose entries record calls on the object
#[repr(C)]
pub(crate) struct FakePlayer {
    vtable: *mut *const (),
    pub equip_calls: AtomicU32,
    pub drop_calls: AtomicU32,
    pub ground_calls: AtomicU32,
    pub run_calls: AtomicU32,
    /// Buttons the original PlayerRunCommand received
    pub last_run_buttons: AtomicI32,
    pub last_ground_handle: AtomicU32,
}

unsafe extern "C" fn noop_original(_this: *mut c_void) {}

unsafe extern "C" fn original_weapon_equip(this: *mut c_void, _weapon: *mut c_void) {
    (*(this as *const FakePlayer))
        .equip_calls
        .fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn original_weapon_drop(
    this: *mut c_void,
    _weapon: *mut c_void,
    _target: *const Vector,
    _velocity: *const Vector,
) {
    (*(this as *const FakePlayer))
        .drop_calls
        .fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn original_run_command(
    this: *mut c_void,
    cmd: *mut c_void,
    _move_helper: *mut IMoveHelper,
) {
    let player = &*(this as *const FakePlayer);
    player.run_calls.fetch_add(1, Ordering::SeqCst);
    if !cmd.is_null() {
        let buttons = (*(cmd as *const ncz_sdk::CUserCmd)).buttons;
        player.last_run_buttons.store(buttons, Ordering::SeqCst);
    }
}

unsafe extern "C" fn original_ground_entity(this: *mut c_void, handle: *const u32) {
    let player = &*(this as *const FakePlayer);
    player.ground_calls.fetch_add(1, Ordering::SeqCst);
    player.last_ground_handle.store(*handle, Ordering::SeqCst);
}

impl FakePlayer {
    /// New object of a fresh class
    pub fn new() -> Box<Self> {
        let mut vtable = [noop_original as *const (); VTABLE_LEN];
        vtable[WEAPON_EQUIP_SLOT] = original_weapon_equip as *const ();
        vtable[WEAPON_DROP_SLOT] = original_weapon_drop as *const ();
        vtable[GROUND_ENTITY_SLOT] = original_ground_entity as *const ();
        vtable[RUN_COMMAND_SLOT] = original_run_command as *const ();
        let vtable = Box::leak(Box::new(vtable)).as_mut_ptr();
        Self::with_vtable(vtable)
    }

    /// New object of the same class as `other`
    pub fn sharing(other: &FakePlayer) -> Box<Self> {
        Self::with_vtable(other.vtable)
    }

    fn with_vtable(vtable: *mut *const ()) -> Box<Self> {
        Box::new(Self {
            vtable,
            equip_calls: AtomicU32::new(0),
            drop_calls: AtomicU32::new(0),
            ground_calls: AtomicU32::new(0),
            run_calls: AtomicU32::new(0),
            last_run_buttons: AtomicI32::new(0),
            last_ground_handle: AtomicU32::new(0),
        })
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self as *const Self as *mut c_void
    }

    pub fn vtable_addr(&self) -> usize {
        self.vtable as usize
    }

    pub fn slot(&self, index: usize) -> *const () {
        unsafe { *self.vtable.add(index) }
    }

    /// Call through the (possibly patched) vtable, like the game would
    pub fn call_weapon_equip(&self, weapon: *mut c_void) {
        unsafe { abi::call_weapon_equip(self.slot(WEAPON_EQUIP_SLOT), self.as_ptr(), weapon) }
    }

    pub fn call_weapon_drop(&self, weapon: *mut c_void) {
        unsafe {
            abi::call_weapon_drop(
                self.slot(WEAPON_DROP_SLOT),
                self.as_ptr(),
                weapon,
                std::ptr::null(),
                std::ptr::null(),
            )
        }
    }

    pub fn call_run_command(&self, cmd: &mut ncz_sdk::CUserCmd) {
        unsafe {
            abi::call_run_command(
                self.slot(RUN_COMMAND_SLOT),
                self.as_ptr(),
                cmd as *mut ncz_sdk::CUserCmd as *mut c_void,
                std::ptr::null_mut(),
            )
        }
    }

    pub fn call_ground_entity(&self, handle: u32) {
        unsafe { abi::call_ground_entity(self.slot(GROUND_ENTITY_SLOT), self.as_ptr(), &handle) }
    }
}

/// Host, player table and slot table wired together
pub(crate) struct Fixture {
    pub fake: Arc<FakeHost>,
    pub host: Arc<dyn Host>,
    pub players: Arc<PlayerTable>,
    pub slots: SlotTable,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_host(FakeHost::new("test"))
    }

    pub fn with_host(fake: FakeHost) -> Self {
        let fake = Arc::new(fake);
        let host: Arc<dyn Host> = fake.clone();
        let target = TargetIdentity::current(host.identity());
        let doc = IniDocument::parse(&config_ini(""));
        let slots = SlotTable::from_document(&doc, &target, slots::ALL).unwrap();

        Self {
            fake,
            host,
            players: Arc::new(PlayerTable::new()),
            slots,
        }
    }

    /// A player of a fresh class at `index`
    pub fn add_player(&self, index: usize, status: SlotStatus) -> (Box<FakePlayer>, EdictRef) {
        let player = FakePlayer::new();
        let edict = self.place_player(&player, index, status);
        (player, edict)
    }

    /// Put an existing fake object in a player slot
    pub fn place_player(&self, player: &FakePlayer, index: usize, status: SlotStatus) -> EdictRef {
        let index = EntityIndex::new(index).unwrap();
        let edict = self.fake.add_entity(player.as_ptr());
        let entity = EntityPtr::from_ptr(player.as_ptr()).unwrap();

        self.players
            .connect(index, "player", status == SlotStatus::Bot);
        if status > SlotStatus::PlayerConnecting || status == SlotStatus::Bot {
            self.players
                .activate(index, edict, entity, self.host.tick_count())
                .unwrap();
        }
        if status == SlotStatus::PlayerInTests {
            self.players.promote(self.host.tick_count(), 0);
        }
        edict
    }

    /// A weapon entity with a valid edict
    pub fn weapon(&self) -> (*mut c_void, EdictRef) {
        let entity = Box::into_raw(Box::new(0u64)) as *mut c_void;
        (entity, self.fake.add_entity(entity))
    }
}
