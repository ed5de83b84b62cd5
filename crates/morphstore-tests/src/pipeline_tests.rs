#[cfg(test)]
mod tests {
    use crate::harness::TestStore;
    use morphstore_object::{Batch, ObjectBackend, Semantics, SharedBuf};
    use morphstore_transform::{TransformationMode, TransformationType};

    const ALL_TYPES: [TransformationType; 4] = [
        TransformationType::None,
        TransformationType::Xor,
        TransformationType::Rle,
        TransformationType::Lz4,
    ];

    const ALL_MODES: [TransformationMode; 3] = [
        TransformationMode::Client,
        TransformationMode::Transport,
        TransformationMode::Server,
    ];

    #[test]
    fn test_roundtrip_every_type_and_mode() {
        for kind in ALL_TYPES {
            for mode in ALL_MODES {
                let store = TestStore::new(4);
                let object = store
                    .create_object("t", "obj", kind, mode, 4096)
                    .unwrap();

                let payload = b"the quick brown fox jumps over the lazy dog";
                let mut batch = Batch::new(Semantics::default());
                object.write(payload, 0, &mut batch).unwrap();
                assert!(batch.execute(), "{kind:?}/{mode:?} write");

                let buf = SharedBuf::zeroed(payload.len());
                let mut batch = Batch::new(Semantics::default());
                let read = object
                    .read(buf.clone(), payload.len() as u64, 0, &mut batch)
                    .unwrap();
                assert!(batch.execute(), "{kind:?}/{mode:?} read");
                assert_eq!(read.get(), payload.len() as u64, "{kind:?}/{mode:?}");
                assert_eq!(buf.to_vec(), payload, "{kind:?}/{mode:?}");
            }
        }
    }

    #[test]
    fn test_client_mode_stores_transformed_form() {
        let store = TestStore::single();
        let object = store
            .create_object(
                "t",
                "obj",
                TransformationType::Xor,
                TransformationMode::Client,
                4096,
            )
            .unwrap();

        let mut batch = Batch::new(Semantics::default());
        object.write(b"secret", 0, &mut batch).unwrap();
        assert!(batch.execute());

        let mut raw = [0u8; 6];
        store.backend.read("t", "obj_0", &mut raw, 0).unwrap();
        assert_ne!(&raw, b"secret");
        let undone: Vec<u8> = raw.iter().map(|b| b ^ 0xFF).collect();
        assert_eq!(undone, b"secret");
    }

    #[test]
    fn test_transport_mode_stores_original_form() {
        // Transport transforms for wire transit only; storage holds the
        // original form.
        let store = TestStore::single();
        let object = store
            .create_object(
                "t",
                "obj",
                TransformationType::Xor,
                TransformationMode::Transport,
                4096,
            )
            .unwrap();

        let mut batch = Batch::new(Semantics::default());
        object.write(b"visible", 0, &mut batch).unwrap();
        assert!(batch.execute());

        let mut raw = [0u8; 7];
        store.backend.read("t", "obj_0", &mut raw, 0).unwrap();
        assert_eq!(&raw, b"visible");
    }

    #[test]
    fn test_server_mode_stores_transformed_form() {
        let store = TestStore::single();
        let object = store
            .create_object(
                "t",
                "obj",
                TransformationType::Rle,
                TransformationMode::Server,
                4096,
            )
            .unwrap();

        let run = vec![9u8; 64];
        let mut batch = Batch::new(Semantics::default());
        object.write(&run, 0, &mut batch).unwrap();
        assert!(batch.execute());

        // Stored form is the RLE pair (count-1, value).
        let status = store.backend.status("t", "obj_0").unwrap();
        assert!(status.size >= 2);
        let mut raw = vec![0u8; status.size as usize];
        store.backend.read("t", "obj_0", &mut raw, 0).unwrap();
        assert_eq!(&raw[..2], &[63, 9]);
    }

    #[test]
    fn test_compression_shrinks_stored_size() {
        let store = TestStore::single();
        let object = store
            .create_object(
                "t",
                "obj",
                TransformationType::Lz4,
                TransformationMode::Client,
                65536,
            )
            .unwrap();

        let payload = vec![42u8; 16 * 1024];
        let mut batch = Batch::new(Semantics::default());
        object.write(&payload, 0, &mut batch).unwrap();
        let status = object.status(&mut batch);
        assert!(batch.execute());

        let status = status.get();
        assert_eq!(status.original_size, payload.len() as u64);
        assert!(status.transformed_size < status.original_size);
    }

    #[test]
    fn test_routing_spreads_names_deterministically() {
        let store = TestStore::new(8);
        let a = store.object("t", "alpha");
        let b = store.object("t", "alpha");
        assert_eq!(a.server_index(), b.server_index());
        assert!(a.server_index() < 8);
    }
}
